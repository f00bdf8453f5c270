//! Interactive pager for browse sessions
//!
//! Reads one-letter commands with reedline and drives the session:
//! `n` next, `p` previous, `g <page>` jump, `r` retry the count, `q` quit.

use std::borrow::Cow;

use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, Signal,
};

use crate::error::Result;
use crate::executor::{BrowseSession, PageResponse};
use crate::formatter::Formatter;

const HELP: &str = "n: next page | p: previous page | g <page>: go to page | r: retry count | q: quit";

/// One pager command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerCommand {
    Next,
    Prev,
    /// 1-based page number as typed
    GoTo(u64),
    Retry,
    Quit,
    Help,
    Empty,
    Unknown(String),
}

impl PagerCommand {
    /// Parse one input line
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return PagerCommand::Empty;
        };

        match (word.to_ascii_lowercase().as_str(), parts.next()) {
            ("n" | "next", None) => PagerCommand::Next,
            ("p" | "prev", None) => PagerCommand::Prev,
            ("g" | "goto", Some(page)) => match page.parse::<u64>() {
                Ok(page) if page > 0 => PagerCommand::GoTo(page),
                _ => PagerCommand::Unknown(line.trim().to_string()),
            },
            ("r" | "retry", None) => PagerCommand::Retry,
            ("q" | "quit" | "exit", None) => PagerCommand::Quit,
            ("h" | "help" | "?", None) => PagerCommand::Help,
            _ => PagerCommand::Unknown(line.trim().to_string()),
        }
    }
}

/// Prompt showing the current page position
pub struct PagerPrompt {
    /// 1-based
    page: u64,
    total_pages: u64,
}

impl PagerPrompt {
    pub fn new(response: &PageResponse) -> Self {
        Self {
            page: response.current_page + 1,
            total_pages: response.total_pages,
        }
    }
}

impl Prompt for PagerPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        format!("page {}/{}> ", self.page, self.total_pages).into()
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        "".into()
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        "... ".into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };

        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}

/// Run the pager until the user quits or closes input
///
/// Errors from a single command are printed and the pager keeps going.
pub async fn run_pager(
    session: &mut BrowseSession,
    formatter: &Formatter,
    first: &PageResponse,
) -> Result<()> {
    let mut editor = Reedline::create();
    let mut prompt = PagerPrompt::new(first);
    println!("{}", formatter.colorizer().dim(HELP));

    loop {
        let line = match editor.read_line(&prompt)? {
            Signal::Success(line) => line,
            _ => break,
        };

        let result = match PagerCommand::parse(&line) {
            PagerCommand::Next => session.next().await,
            PagerCommand::Prev => session.prev().await,
            PagerCommand::GoTo(page) => session.go_to(page - 1).await,
            PagerCommand::Retry => session.retry_count().await,
            PagerCommand::Quit => break,
            PagerCommand::Help => {
                println!("{}", HELP);
                continue;
            }
            PagerCommand::Empty => continue,
            PagerCommand::Unknown(input) => {
                eprintln!(
                    "{}",
                    formatter
                        .colorizer()
                        .warning(&format!("Unknown command '{}'. {}", input, HELP))
                );
                continue;
            }
        };

        match result {
            Ok(response) => {
                println!("{}", formatter.format_page(&response));
                prompt = PagerPrompt::new(&response);
            }
            Err(e) => eprintln!("{}", formatter.colorizer().error(&e.to_string())),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::CountStatus;
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!(PagerCommand::parse("n"), PagerCommand::Next);
        assert_eq!(PagerCommand::parse(" P "), PagerCommand::Prev);
        assert_eq!(PagerCommand::parse("g 3"), PagerCommand::GoTo(3));
        assert_eq!(PagerCommand::parse("r"), PagerCommand::Retry);
        assert_eq!(PagerCommand::parse("q"), PagerCommand::Quit);
        assert_eq!(PagerCommand::parse(""), PagerCommand::Empty);
    }

    #[test]
    fn test_parse_rejects_bad_page() {
        assert!(matches!(PagerCommand::parse("g 0"), PagerCommand::Unknown(_)));
        assert!(matches!(PagerCommand::parse("g x"), PagerCommand::Unknown(_)));
        assert!(matches!(PagerCommand::parse("g"), PagerCommand::Unknown(_)));
        assert!(matches!(PagerCommand::parse("n 2"), PagerCommand::Unknown(_)));
    }

    #[test]
    fn test_prompt_shows_position() {
        let response = PageResponse {
            records: Vec::new(),
            total_records: 250,
            total_pages: 3,
            current_page: 1,
            fetch_latency: Duration::ZERO,
            count_status: CountStatus::Exact,
        };
        let prompt = PagerPrompt::new(&response);
        assert_eq!(prompt.render_prompt_left(), "page 2/3> ");
        assert_eq!(prompt.render_prompt_right(), "");
    }
}
