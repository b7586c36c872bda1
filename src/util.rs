use rand::Rng;

/// Pronounceable random string, used for confirmation codes and session
/// cookies.
pub fn generate_random_string(len: usize) -> String {
    const WOWELS: &str = "aeiouy";
    const CONSONANTS: &str = "bcdfghjklmnopqrstvwxz";
    let mut rng = rand::rng();
    (0..len)
        .map(|n| {
            let charset = if n % 2 == 0 { CONSONANTS } else { WOWELS };
            let idx = rng.random_range(0..charset.len());
            charset.as_bytes()[idx] as char
        })
        .collect()
}

/// Template projection of an ISO date, `"2024-06-01"` -> `"Sat, Jun 1, 2024"`.
/// Anything unparseable passes through untouched.
pub(crate) fn datestr(iso_date_str: Option<&str>) -> String {
    let Some(s) = iso_date_str else {
        return "---".to_string()
    };
    if let Ok(date) = s.parse::<chrono::NaiveDate>() {
        date.format("%a, %b %-d, %Y").to_string()
    } else {
        s.to_string()
    }
}

#[test]
fn test_generate_random_string() {
    let s = generate_random_string(10);
    assert_eq!(s.len(), 10);
    assert!(s.chars().all(|c| c.is_ascii_lowercase()));
    assert_ne!(s, generate_random_string(10));
}

#[test]
fn test_datestr() {
    assert_eq!(datestr(Some("2024-06-01")), "Sat, Jun 1, 2024");
    assert_eq!(datestr(Some("not a date")), "not a date");
    assert_eq!(datestr(None), "---");
}
