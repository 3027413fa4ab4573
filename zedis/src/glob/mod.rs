mod __test__;

/// Glob match over raw bytes supporting `*` (any run, including empty) and
/// `?` (exactly one byte). Iterative with single-star backtracking, so
/// pathological patterns stay linear in `text.len() * stars`.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
  let (mut p, mut t) = (0usize, 0usize);
  let mut star: Option<(usize, usize)> = None;

  while t < text.len() {
    if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
      p += 1;
      t += 1;
    } else if p < pattern.len() && pattern[p] == b'*' {
      star = Some((p, t));
      p += 1;
    } else if let Some((sp, st)) = star {
      // Rewind to the last star and let it swallow one more byte
      p = sp + 1;
      t = st + 1;
      star = Some((sp, st + 1));
    } else {
      return false;
    }
  }

  while p < pattern.len() && pattern[p] == b'*' {
    p += 1;
  }
  p == pattern.len()
}
