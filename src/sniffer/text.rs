//! Byte helpers shared by the text protocol matchers.
//!
//! Keywords are written in upper case. A keyword matches when the input
//! holds it either exactly as written or entirely in lower case; mixed case
//! does not match.

/// `input` starts with `keyword` in upper or lower case
pub(super) fn starts_with_keyword(input: &[u8], keyword: &[u8]) -> bool {
    let Some(head) = input.get(..keyword.len()) else {
        return false;
    };
    head == keyword
        || head
            .iter()
            .zip(keyword)
            .all(|(b, k)| *b == k.to_ascii_lowercase())
}

/// Match `METHOD SP` at the start of `input` for one of `methods`, returning
/// the remainder after the single space.
pub(super) fn strip_method<'a>(input: &'a [u8], methods: &[&[u8]]) -> Option<&'a [u8]> {
    methods.iter().find_map(|method| {
        if !starts_with_keyword(input, method) {
            return None;
        }
        let rest = &input[method.len()..];
        match rest.split_first() {
            Some((b' ', rest)) if rest.first() != Some(&b' ') => Some(rest),
            _ => None,
        }
    })
}
