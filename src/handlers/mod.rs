pub mod dashboard;
pub mod data;
pub mod query;

use std::path::PathBuf;

use crate::models::chart::ChartType;
use crate::services::store::ActiveView;

/// A parsed line of terminal input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Sample,
    Upload(PathBuf),
    View(ActiveView),
    Dashboard,
    Chart(ChartType),
    Rows(u32),
    Ask(String),
    Draft(String),
    Send,
    Transcript,
    Status,
    Help,
    Quit,
    Invalid(String),
}

pub const HELP: &str = "\
Commands (prefix with '/' while in the query view):
  sample               load the built-in sample dataset
  upload <path.csv>    upload a CSV file
  view dashboard|query switch the active view
  dashboard            show KPIs and charts
  chart <type>         fetch a single chart, e.g. conversion-funnel
  rows [page]          browse raw rows
  ask <question>       ask a question about the data
  draft <text>, send   stage a question, then send it
  transcript           show the conversation
  status               show loading and error state
  help, quit";

/// Parse one input line. In the query view, text without a leading '/' is a
/// question; elsewhere the '/' is optional.
pub fn parse_command(line: &str, view: ActiveView) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let body = match line.strip_prefix('/') {
        Some(rest) => rest.trim_start(),
        None if view == ActiveView::Query => return Some(Command::Ask(line.to_string())),
        None => line,
    };

    let (verb, rest) = match body.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (body, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "sample" => Command::Sample,
        "upload" if rest.is_empty() => Command::Invalid("upload needs a file path".to_string()),
        "upload" => Command::Upload(PathBuf::from(rest)),
        "view" => match rest.parse() {
            Ok(view) => Command::View(view),
            Err(e) => Command::Invalid(e),
        },
        "dashboard" | "charts" => Command::Dashboard,
        "chart" => match rest.parse() {
            Ok(chart_type) => Command::Chart(chart_type),
            Err(e) => Command::Invalid(e),
        },
        "rows" if rest.is_empty() => Command::Rows(1),
        "rows" => match rest.parse() {
            Ok(page) => Command::Rows(page),
            Err(_) => Command::Invalid(format!("'{}' is not a page number", rest)),
        },
        "ask" => Command::Ask(rest.to_string()),
        "draft" => Command::Draft(rest.to_string()),
        "send" => Command::Send,
        "transcript" | "history" => Command::Transcript,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command '{}', try 'help'", other)),
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_view_takes_bare_commands() {
        let view = ActiveView::Dashboard;
        assert_eq!(parse_command("sample", view), Some(Command::Sample));
        assert_eq!(
            parse_command("upload ./data/sales.csv", view),
            Some(Command::Upload(PathBuf::from("./data/sales.csv")))
        );
        assert_eq!(parse_command("rows", view), Some(Command::Rows(1)));
        assert_eq!(parse_command("rows 3", view), Some(Command::Rows(3)));
        assert_eq!(
            parse_command("chart conversion-funnel", view),
            Some(Command::Chart(ChartType::ConversionFunnel))
        );
        assert_eq!(parse_command("   ", view), None);
    }

    #[test]
    fn query_view_treats_plain_text_as_question() {
        let view = ActiveView::Query;
        assert_eq!(
            parse_command("status of the west region?", view),
            Some(Command::Ask("status of the west region?".to_string()))
        );
        assert_eq!(parse_command("/status", view), Some(Command::Status));
        assert_eq!(
            parse_command("/view dashboard", view),
            Some(Command::View(ActiveView::Dashboard))
        );
    }

    #[test]
    fn bad_arguments_are_reported() {
        let view = ActiveView::Dashboard;
        assert!(matches!(parse_command("upload", view), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("rows two", view), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("chart donut", view), Some(Command::Invalid(_))));
        assert!(matches!(parse_command("frobnicate", view), Some(Command::Invalid(_))));
    }
}
