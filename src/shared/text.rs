/// Blank means empty or whitespace-only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Joins lines with `,`, or `None` when there were no lines.
pub fn join_lines<I, S>(lines: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined: Option<String> = None;
    for line in lines {
        match joined.as_mut() {
            Some(out) => {
                out.push(',');
                out.push_str(line.as_ref());
            }
            None => joined = Some(line.as_ref().to_string()),
        }
    }
    joined
}
