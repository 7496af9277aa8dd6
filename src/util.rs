//! Small utility helpers used across modules.

/// Upper-case the first character and lower-case the rest ("hELLO" -> "Hello").
/// Works on chars, so Hebrew or empty input passes through unchanged.
pub fn capitalize_first(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
    None => String::new(),
  }
}

/// 64-bit FNV-1a. Same value on every platform, unlike `DefaultHasher`.
pub fn fnv1a(s: &str) -> u64 {
  const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
  const PRIME: u64 = 0x0000_0100_0000_01b3;
  s.bytes().fold(OFFSET, |h, b| (h ^ b as u64).wrapping_mul(PRIME))
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    format!("{}… ({} bytes total)", s.chars().take(max).collect::<String>(), s.len())
  }
}
