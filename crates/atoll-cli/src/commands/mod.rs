pub mod run;
pub mod tools;
pub mod validate;

use atoll_core::tools::StaticToolCatalog;

/// The built-in demo catalog backing `run` and `tools`. A deployment
/// wires its own [`atoll_core::tools::ToolCatalog`] here.
pub fn demo_catalog() -> StaticToolCatalog {
    StaticToolCatalog::with_tools([
        ("Gmail.SendEmail", "Send an email from the user's account"),
        ("Github.ListRepos", "List the user's repositories"),
        ("Github.CreateIssue", "Open an issue in a repository"),
        ("Slack.PostMessage", "Post a message to a channel"),
        ("Web.Search", "Search the web and return result snippets"),
        ("Web.Fetch", "Fetch a page and return its text content"),
    ])
}
