/// The leading whitespace of the line containing `offset`, provided the line
/// holds nothing but whitespace before `offset`. A statement sharing its line
/// with other tokens gets a plain tab.
pub(crate) fn line_indent(source: &str, offset: usize) -> &str {
    let start = line_start(source, offset);
    let prefix = &source[start..offset];
    if prefix.chars().all(char::is_whitespace) {
        prefix
    } else {
        "\t"
    }
}

/// The byte offset at which the line containing `offset` starts.
pub(crate) fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// The byte offset just past the newline that ends the line containing
/// `offset`, or the end of `source`.
pub(crate) fn line_end(source: &str, offset: usize) -> usize {
    source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i + 1)
}

/// The whole lines spanned by `start..end`, extended over the trailing
/// newline and at most one following blank line. Used when deleting a
/// declaration or statement without leaving a hole.
pub(crate) fn whole_lines(source: &str, start: usize, end: usize) -> std::ops::Range<usize> {
    let start = line_start(source, start);
    let mut end = line_end(source, end);
    if source[end..].starts_with('\n') {
        end += 1;
    }
    start..end
}

pub(crate) fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().collect::<String>() + chars.as_str()
    })
}

pub(crate) fn strip_get_prefix(name: &str) -> &str {
    name.strip_prefix("get")
        .or_else(|| name.strip_prefix("Get"))
        .unwrap_or(name)
}

/// Escapes `%` so that arbitrary text can be inlined into a format string
/// without introducing verbs.
pub(crate) fn escape_percents(text: &str) -> String {
    text.replace('%', "%%")
}
