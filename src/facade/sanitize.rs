use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Tags a job description may keep. Attributes are always dropped.
const DESCRIPTION_TAGS: [&str; 4] = ["p", "br", "ul", "li"];

lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<\s*(/?)\s*([A-Za-z][A-Za-z0-9]*)[^>]*>").unwrap();
}

fn clean_once(input: &str, keep: &[&str]) -> String {
    let without_comments = COMMENT_RE.replace_all(input, "");
    TAG_RE
        .replace_all(&without_comments, |caps: &Captures| {
            let name = caps[2].to_ascii_lowercase();
            if keep.contains(&name.as_str()) {
                format!("<{}{}>", &caps[1], name)
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Removing one tag can join its neighbours into a new one, so passes repeat
/// until nothing changes. Each pass never lengthens the text.
fn clean(input: &str, keep: &[&str]) -> String {
    let mut current = clean_once(input, keep);
    loop {
        let next = clean_once(&current, keep);
        if next == current {
            return current.trim().to_string();
        }
        current = next;
    }
}

/// Removes every markup tag from user-supplied text.
pub fn strip_tags(input: &str) -> String {
    clean(input, &[])
}

pub fn clean_description(input: &str) -> String {
    clean(input, &DESCRIPTION_TAGS)
}
