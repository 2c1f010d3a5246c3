use regex::Regex;
use lazy_static::lazy_static;
use crate::models::metrics::RepoId;

lazy_static! {
    static ref GITHUB_URL_REGEX: Regex = Regex::new(
        r"^(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9-]+)/([A-Za-z0-9._-]+?)(?:\.git)?/?$"
    ).unwrap();

    static ref REPO_ID_REGEX: Regex = Regex::new(
        r"^([A-Za-z0-9-]+)/([A-Za-z0-9._-]+)$"
    ).unwrap();

    static ref LINK_LAST_REGEX: Regex = Regex::new(
        r#"<([^>]+)>\s*;\s*rel="last""#
    ).unwrap();

    static ref PAGE_PARAM_REGEX: Regex = Regex::new(
        r"[?&]page=(\d+)"
    ).unwrap();
}

/// Parses one repository-list entry: `owner/name` or a github.com URL.
/// Owners are letters, digits and hyphens only, so a truncated URL such
/// as `github.com/foo` is rejected rather than read as owner `github.com`.
pub fn parse_repo_entry(entry: &str) -> Option<RepoId> {
    let caps = GITHUB_URL_REGEX
        .captures(entry)
        .or_else(|| REPO_ID_REGEX.captures(entry))?;

    let owner = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();

    Some(RepoId::new(owner, name))
}

/// Page number of the `rel="last"` target in a GitHub `Link` header.
pub fn last_page_from_link(link: &str) -> Option<u64> {
    let last_url = LINK_LAST_REGEX.captures(link)?.get(1)?.as_str();
    PAGE_PARAM_REGEX
        .captures(last_url)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
