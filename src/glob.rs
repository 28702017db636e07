//! Glob matching for gitignore and editorconfig pattern syntax
//!
//! Both `.gitattributes` and `.editorconfig` sections select files by glob,
//! but with different dialects: gitignore treats `*` as not crossing path
//! separators and gives `**` positional meaning, while editorconfig lets
//! `*` cross separators and adds `{a,b}` / `{n1..n2}` brace expansion.
//! Patterns are translated to anchored regular expressions.

use regex::Regex;

/// Dialect switches for pattern translation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobOptions {
   /// Enable `{s1,s2}` and `{n1..n2}` brace expansion
   pub braces: bool,
   /// `*` matches across path separators
   pub asterisk_crosses_separators: bool,
   /// `**` matches any string regardless of position
   pub double_asterisk_any: bool,
}

impl GlobOptions {
   /// Gitignore-style matching (`.gitattributes` patterns).
   pub const GITIGNORE: Self =
      Self { braces: false, asterisk_crosses_separators: false, double_asterisk_any: false };

   /// EditorConfig section matching.
   pub const EDITORCONFIG: Self =
      Self { braces: true, asterisk_crosses_separators: true, double_asterisk_any: true };
}

/// Test whether `path` matches `pattern` under the given dialect.
pub fn matches(pattern: &str, path: &str, options: GlobOptions) -> bool {
   let translated = translate_pattern(pattern, options);
   Regex::new(&translated).is_ok_and(|re| re.is_match(path))
}

/// Translate a glob pattern into an anchored regular expression.
pub fn translate_pattern(pattern: &str, options: GlobOptions) -> String {
   let chars: Vec<char> = pattern.chars().collect();
   let n = chars.len();
   let mut i = 0;
   let mut result: Vec<String> = Vec::new();

   let single_star = if options.asterisk_crosses_separators { ".*" } else { "[^/]*" };

   while i < n {
      let c = chars[i];
      i += 1;

      match c {
         '\\' if i < n => {
            result.push(regex::escape(&chars[i].to_string()));
            i += 1;
         },
         '*' => {
            if i < n && chars[i] == '*' {
               i += 1;

               if options.double_asterisk_any {
                  result.push(".*".to_string());
               } else if i < n && chars[i] == '/' && result.is_empty() {
                  // Leading `**/` matches any directory prefix.
                  i += 1;
                  result.push("(?:.*?/)?".to_string());
               } else if i == n && result.last().is_some_and(|l| l == "/") {
                  // Trailing `/**` matches everything below a directory.
                  result.pop();
                  result.push("(?:/.*)?".to_string());
               } else if i < n && chars[i] == '/' && result.last().is_some_and(|l| l == "/") {
                  // `/**/` in the middle collapses to any depth.
                  i += 1;
                  result.push("(?:.*/)?".to_string());
               } else {
                  result.push(single_star.to_string());
                  result.push(single_star.to_string());
               }
            } else {
               result.push(single_star.to_string());
            }
         },
         '?' => result.push("[^/]".to_string()),
         '[' => {
            let (class, next) = translate_char_class(&chars, i);
            result.push(class);
            i = next;
         },
         '{' if options.braces => {
            let (alternatives, next) = translate_braces(&chars, i);
            result.push(alternatives);
            i = next;
         },
         other => result.push(regex::escape(&other.to_string())),
      }
   }

   format!("^{}$", result.concat())
}

/// Translate a `[...]` character class starting after the opening bracket.
/// Returns the regex fragment and the index after the class.
fn translate_char_class(chars: &[char], start: usize) -> (String, usize) {
   let n = chars.len();
   let mut j = start;
   if j < n && chars[j] == '!' {
      j += 1;
   }
   if j < n && chars[j] == ']' {
      j += 1;
   }
   while j < n && chars[j] != ']' {
      j += 1;
   }
   if j >= n {
      // Unterminated class: a literal bracket.
      return ("\\[".to_string(), start);
   }

   let body: String = chars[start..j].iter().collect();
   let translated = if let Some(negated) = body.strip_prefix('!') {
      format!("[^{negated}]")
   } else if body.starts_with('^') {
      format!("[\\{body}]")
   } else if body.is_empty() {
      "\\[\\]".to_string()
   } else {
      format!("[{body}]")
   };

   (translated, j + 1)
}

/// Translate `{a,b}` alternation or `{n1..n2}` numeric ranges starting after
/// the opening brace. Returns the regex fragment and the index after `}`.
fn translate_braces(chars: &[char], start: usize) -> (String, usize) {
   let n = chars.len();
   let mut j = start;
   let mut depth = 1;
   while j < n && depth > 0 {
      match chars[j] {
         '{' => depth += 1,
         '}' => depth -= 1,
         _ => {},
      }
      j += 1;
   }
   if depth > 0 {
      // No closing brace: a literal one.
      return ("\\{".to_string(), start);
   }

   let content: String = chars[start..j - 1].iter().collect();

   // Numeric range {n1..n2}
   if let Some((lo, hi)) = content.split_once("..")
      && let (Ok(lo), Ok(hi)) = (lo.parse::<i64>(), hi.parse::<i64>())
   {
      let range: Vec<String> = if lo <= hi {
         (lo..=hi).map(|v| v.to_string()).collect()
      } else {
         (hi..=lo).rev().map(|v| v.to_string()).collect()
      };
      return (format!("(?:{})", range.join("|")), j);
   }

   // Comma-separated alternatives, respecting nested braces.
   let mut items: Vec<String> = Vec::new();
   let mut current = String::new();
   let mut nested = 0;
   for ch in content.chars() {
      match ch {
         '{' => {
            nested += 1;
            current.push(ch);
         },
         '}' => {
            nested -= 1;
            current.push(ch);
         },
         ',' if nested == 0 => items.push(std::mem::take(&mut current)),
         _ => current.push(ch),
      }
   }
   items.push(current);

   let alternatives: Vec<String> = items.iter().map(|item| regex::escape(item)).collect();
   (format!("(?:{})", alternatives.join("|")), j)
}
