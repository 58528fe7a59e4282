//! String helpers shared by the template registry and the normalizer.

/// Replace every `{key}` in `tpl` in a single pass. Inserted values are never
/// rescanned, and braces that do not name a key (JSON examples) stay as written.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (close, *v))
    });
    match hit {
      Some((close, value)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Whitespace-separated word count, as a student would count an essay.
pub fn word_count(s: &str) -> usize {
  s.split_whitespace().count()
}

/// Cut `s` to at most `max` bytes for logging, on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_leaves_json_braces_alone() {
    let out = fill_template(r#"Topic '{topic}'. Return {"question": "..."}"#, &[("topic", "bees")]);
    assert_eq!(out, r#"Topic 'bees'. Return {"question": "..."}"#);
  }

  #[test]
  fn fill_template_does_not_rescan_inserted_values() {
    let out = fill_template("{a}|{b}|{a}", &[("a", "{b}"), ("b", "x{a}")]);
    assert_eq!(out, "{b}|x{a}|{b}");
    assert_eq!(fill_template("{unknown} {", &[("a", "1")]), "{unknown} {");
  }

  #[test]
  fn word_count_ignores_extra_whitespace() {
    assert_eq!(word_count("  one two\n\tthree  "), 3);
    assert_eq!(word_count(""), 0);
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "ééééé";
    let out = trunc_for_log(s, 3);
    assert!(out.starts_with('é'));
    assert!(out.ends_with("(10 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
