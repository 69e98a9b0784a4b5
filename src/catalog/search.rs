use crate::catalog::ApplicationCatalog;
use crate::entry::ShortcutEntry;

/// Entries whose name contains every whitespace-separated word of `query`,
/// ignoring case, in catalog order. An empty query matches everything.
pub fn search<'a>(catalog: &'a ApplicationCatalog, query: &str) -> Vec<&'a ShortcutEntry> {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    catalog
        .entries()
        .iter()
        .filter(|entry| matches(&entry.name, &words))
        .collect()
}

fn matches(name: &str, words: &[String]) -> bool {
    let name = name.to_lowercase();
    words.iter().all(|word| name.contains(word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> ApplicationCatalog {
        let entries = names
            .iter()
            .enumerate()
            .map(|(idx, name)| ShortcutEntry::combo(*name, format!("ctrl+{}", idx % 10)))
            .collect();
        ApplicationCatalog::new("test", entries)
    }

    fn names<'a>(entries: &[&'a ShortcutEntry]) -> Vec<&'a str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let catalog = catalog(&["Undo", "Redo", "Copy"]);
        assert_eq!(names(&search(&catalog, "")), vec!["Undo", "Redo", "Copy"]);
        assert_eq!(names(&search(&catalog, "   ")), vec!["Undo", "Redo", "Copy"]);
    }

    #[test]
    fn every_word_must_be_a_substring() {
        let catalog = catalog(&["Copy Selected Text", "Copy Line", "Select All", "Text Size"]);
        assert_eq!(names(&search(&catalog, "cop text")), vec!["Copy Selected Text"]);
        assert_eq!(names(&search(&catalog, "SELECT")), vec!["Copy Selected Text", "Select All"]);
        assert_eq!(names(&search(&catalog, "ext")), vec!["Copy Selected Text", "Text Size"]);
        assert!(search(&catalog, "paste").is_empty());
    }

    #[test]
    fn random_catalogs_satisfy_the_match_rule() {
        const WORDS: &[&str] = &["open", "close", "File", "tab", "Window", "new", "save", "all"];
        let mut rng = fastrand::Rng::with_seed(7);

        for _ in 0..200 {
            let names: Vec<String> = (0..rng.usize(0..12))
                .map(|_| {
                    (0..rng.usize(1..4))
                        .map(|_| WORDS[rng.usize(..WORDS.len())])
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let catalog = catalog(&name_refs);

            let query: Vec<String> = (0..rng.usize(1..3))
                .map(|_| {
                    let word = WORDS[rng.usize(..WORDS.len())];
                    word[..rng.usize(1..=word.len())].to_uppercase()
                })
                .collect();
            let query = query.join(" ");
            let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

            let found = search(&catalog, &query);
            let expected: Vec<&ShortcutEntry> = catalog
                .entries()
                .iter()
                .filter(|e| words.iter().all(|w| e.name.to_lowercase().contains(w.as_str())))
                .collect();
            assert_eq!(found, expected, "query {query:?}");
            for entry in catalog.entries() {
                let included = found.iter().any(|f| std::ptr::eq(*f, entry));
                let all_present = words.iter().all(|w| entry.name.to_lowercase().contains(w.as_str()));
                assert_eq!(included, all_present, "{:?} vs {query:?}", entry.name);
            }
        }
    }
}
