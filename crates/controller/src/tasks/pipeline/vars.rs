//! Template variables substituted into a run spec before it is parsed

use super::client::PipelineOptions;

const SHORT_COMMIT_LEN: usize = 10;

/// Abbreviated commit hash, at most ten characters
pub fn shorten(hash: &str) -> &str {
    match hash.char_indices().nth(SHORT_COMMIT_LEN) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

fn replace_var(input: &str, name: &str, value: &str) -> String {
    input.replace(&format!("${name}"), value)
}

/// Expand `$COMMIT` (short hash) and `$REVISION` in a run spec template
pub fn replace_vars(input: &str, options: &PipelineOptions) -> String {
    let expanded = replace_var(input, "COMMIT", shorten(&options.git_commit));
    replace_var(&expanded, "REVISION", &options.git_revision)
}
