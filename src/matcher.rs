//! Resolves a name the model suggested against a budget's own entities.
//!
//! Three passes, strongest first: case-insensitive equality, containment in
//! either direction, then shared words. The first pass with any hit decides;
//! more than one hit in that pass is ambiguous and never guessed between.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(i64),
    Ambiguous(Vec<i64>),
    NotFound,
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True when two names differ only in case or spacing.
pub fn same_name(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_string)
        .collect()
}

fn decide(hits: Vec<i64>) -> Option<Resolution> {
    match hits.len() {
        0 => None,
        1 => Some(Resolution::Resolved(hits[0])),
        _ => Some(Resolution::Ambiguous(hits)),
    }
}

pub fn resolve<'a, I>(query: &str, entities: I) -> Resolution
where
    I: IntoIterator<Item = (i64, &'a str)>,
{
    let query = normalize(query);
    if query.is_empty() {
        return Resolution::NotFound;
    }
    let entities: Vec<(i64, String)> = entities
        .into_iter()
        .map(|(id, name)| (id, normalize(name)))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    let exact: Vec<i64> = entities
        .iter()
        .filter(|(_, name)| *name == query)
        .map(|(id, _)| *id)
        .collect();
    if let Some(r) = decide(exact) {
        return r;
    }

    let contained: Vec<i64> = entities
        .iter()
        .filter(|(_, name)| name.contains(&query) || query.contains(name.as_str()))
        .map(|(id, _)| *id)
        .collect();
    if let Some(r) = decide(contained) {
        return r;
    }

    let query_words = words(&query);
    let scored: Vec<(i64, usize)> = entities
        .iter()
        .map(|(id, name)| {
            let shared = words(name).iter().filter(|w| query_words.contains(w)).count();
            (*id, shared)
        })
        .filter(|(_, shared)| *shared > 0)
        .collect();
    let best = scored.iter().map(|(_, s)| *s).max().unwrap_or(0);
    let top = scored
        .into_iter()
        .filter(|(_, s)| *s == best)
        .map(|(id, _)| id)
        .collect();
    decide(top).unwrap_or(Resolution::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNTS: &[(i64, &str)] = &[
        (1, "Checking"),
        (2, "Main Checking"),
        (3, "Savings Account"),
        (4, "Chase Sapphire"),
    ];

    fn run(query: &str) -> Resolution {
        resolve(query, ACCOUNTS.iter().copied())
    }

    #[test]
    fn test_exact_match_beats_containment() {
        assert_eq!(run("checking"), Resolution::Resolved(1));
        assert_eq!(run("  CHECKING "), Resolution::Resolved(1));
    }

    #[test]
    fn test_containment_match() {
        assert_eq!(run("savings"), Resolution::Resolved(3));
        assert_eq!(run("my chase sapphire card"), Resolution::Resolved(4));
    }

    #[test]
    fn test_containment_ties_are_ambiguous() {
        let cats = [(10, "Target Shopping"), (11, "Target Household"), (12, "Groceries")];
        assert_eq!(
            resolve("Target", cats.iter().copied()),
            Resolution::Ambiguous(vec![10, 11])
        );
    }

    #[test]
    fn test_shared_word_match() {
        assert_eq!(run("sapphire visa"), Resolution::Resolved(4));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(run("brokerage"), Resolution::NotFound);
        assert_eq!(run(""), Resolution::NotFound);
    }

    #[test]
    fn test_same_name_ignores_case_and_spacing() {
        assert!(same_name("Pet  Food", " pet food"));
        assert!(!same_name("Pet Food", "Pets"));
    }
}
