use std::borrow::Cow;

use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

/// Shell prompt showing who is logged in and which database they are on.
pub struct ShellPrompt {
    username: String,
    db_name: String,
}

impl ShellPrompt {
    pub fn new(username: String, db_name: String) -> Self {
        Self { username, db_name }
    }
}

impl Prompt for ShellPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}@{}=> ", self.username, self.db_name))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => Cow::Borrowed(""),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Insert => Cow::Borrowed("[INS] "),
                reedline::PromptViMode::Normal => Cow::Borrowed("[NOR] "),
            },
            PromptEditMode::Custom(_) => Cow::Borrowed(""),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let _prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "?",
        };
        match history_search.term.as_str() {
            "" => Cow::Borrowed("(reverse-i-search): "),
            _ => Cow::Owned(format!("(reverse-i-search '{}'): ", history_search.term)),
        }
    }
}
