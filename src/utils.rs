/// Shared utility functions

/// Replace path-unsafe characters with a space so a paper title can be used
/// as a file name on any platform.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}
