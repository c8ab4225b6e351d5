//! Categories command for wordcall.
//!
//! Lists the word pools a round can be drawn from.

use serde::Serialize;

use crate::core::{Vocabulary, WORD_COUNT_OPTIONS};

/// Options for the categories command.
#[derive(Debug, Clone, Default)]
pub struct CategoriesOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One word pool.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub words: Vec<String>,
}

/// Output format for the categories command.
#[derive(Debug, Clone, Serialize)]
pub struct CategoriesOutput {
    pub success: bool,
    pub categories: Vec<CategoryInfo>,
    /// Word counts offered at setup.
    pub word_count_options: Vec<usize>,
}

/// The categories command implementation.
pub struct CategoriesCommand {
    vocabulary: Vocabulary,
}

impl CategoriesCommand {
    /// Create a new categories command.
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Run the categories command.
    pub fn run(&self) -> CategoriesOutput {
        CategoriesOutput {
            success: true,
            categories: self
                .vocabulary
                .categories()
                .iter()
                .map(|c| CategoryInfo {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    words: c.words.iter().map(|w| w.word.clone()).collect(),
                })
                .collect(),
            word_count_options: WORD_COUNT_OPTIONS.to_vec(),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CategoriesOutput, options: &CategoriesOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if output.categories.is_empty() {
            return "No categories found.\n".to_string();
        }

        let mut lines = Vec::new();
        for category in &output.categories {
            lines.push(format!(
                "{} ({}): {} word(s)",
                category.id,
                category.name,
                category.words.len()
            ));
            if !category.words.is_empty() {
                lines.push(format!("   {}", category.words.join(", ")));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_builtin_pools() {
        let cmd = CategoriesCommand::new(Vocabulary::builtin());
        let output = cmd.run();

        assert_eq!(output.categories.len(), 3);
        assert_eq!(output.categories[0].words, vec!["Apple", "Banana"]);
        assert_eq!(output.word_count_options.first(), Some(&5));
        assert_eq!(output.word_count_options.last(), Some(&50));

        let text = cmd.format_output(&output, &CategoriesOptions::default());
        assert!(text.contains("food (Food): 2 word(s)"));
        assert!(text.contains("Soccer, Baseball"));
    }
}
