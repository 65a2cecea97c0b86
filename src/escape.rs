//! Serialization helpers shared by text, attribute values and comments.

/// Append `s` to `out`, escaping `&`, `<`, `>`, `'` and `"`.
///
/// The entity forms are fixed (`&#39;` and `&#34;` for quotes), so escaped output is stable
/// across repeated sanitization.
pub(crate) fn escape_into(out: &mut String, mut s: &str) {
    while let Some(i) = find_special(s) {
        out.push_str(&s[..i]);
        out.push_str(match s.as_bytes()[i] {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'\'' => "&#39;",
            _ => "&#34;",
        });
        // all special bytes are ASCII, so i + 1 is a char boundary
        s = &s[i + 1..];
    }
    out.push_str(s);
}

/// Escape only `<` and `>`, for comment bodies.
pub(crate) fn escape_angle_brackets_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    out
}

#[inline]
fn find_special(s: &str) -> Option<usize> {
    #[cfg(feature = "jetscii")]
    {
        jetscii::bytes!(b'&', b'<', b'>', b'\'', b'"').find(s.as_bytes())
    }

    #[cfg(not(feature = "jetscii"))]
    {
        s.bytes()
            .position(|b| matches!(b, b'&' | b'<' | b'>' | b'\'' | b'"'))
    }
}
