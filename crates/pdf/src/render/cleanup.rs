use crate::parser::rows::is_numbering_prefix;

/// Join bare enumerator lines with the text they number.
///
/// A line whose trimmed content is only an enumerator such as `.2` is
/// replaced by `"<enumerator> <next line trimmed>"`, where the next line is
/// the following non-blank line; blank lines in between are dropped.  An
/// enumerator with nothing after it is kept unchanged.  Every other line
/// passes through untouched.
pub fn merge_numbering_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        if !is_numbering_prefix(trimmed) {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let next = (i + 1..lines.len()).find(|&j| !lines[j].trim().is_empty());
        match next {
            Some(j) => {
                out.push(format!("{} {}", trimmed, lines[j].trim()));
                i = j + 1;
            }
            None => {
                out.push(line.to_string());
                i += 1;
            }
        }
    }

    out.join("\n")
}
