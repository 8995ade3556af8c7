//! Tests for dataset loading and hot reload.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use letter_rush::{ALL_TOPICS, DatasetLoader, SharedWordSets, WordSetProvider, WordSets, validate};

fn write(dir: &TempDir, relative: &str, content: &str) {
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create dir");
    }
    fs::write(path, content).expect("Failed to write dataset");
}

#[test]
fn test_load_all_creates_extra_dir_and_every_topic() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = DatasetLoader::new(dir.path());

    let sets = loader.load_all().expect("Load failed");
    assert!(dir.path().join("extra").is_dir());
    assert_eq!(sets.categories(), ALL_TOPICS.map(String::from).to_vec());
    assert!(sets.sizes().values().all(|count| *count == 0));
}

#[test]
fn test_base_and_extra_lists_are_merged_and_normalized() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "animal.json", r#"["Bear", " cat ", "", 42]"#);
    write(&dir, "extra/animal.txt", "Beaver\r\n\n  dog\n");
    write(&dir, "extra/animal.json", r#"["BEAR", "eagle"]"#);
    write(&dir, "extra/animal.csv", "fox,mammal\n  Goat , mammal\n,empty\n");

    let sets = DatasetLoader::new(dir.path()).load_all().expect("Load failed");
    for word in ["bear", "cat", "42", "beaver", "dog", "eagle", "fox", "goat"] {
        assert!(sets.contains("animal", word), "missing {word}");
    }
    assert_eq!(sets.sizes()["animal"], 8);
    assert!(!sets.contains("animal", "mammal"));
}

#[test]
fn test_malformed_files_are_skipped() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "food.json", "not json at all");
    write(&dir, "city.json", r#"{"berlin": true}"#);
    write(&dir, "extra/food.txt", "bread\n");

    let sets = DatasetLoader::new(dir.path()).load_all().expect("Load failed");
    assert_eq!(sets.sizes()["food"], 1);
    assert_eq!(sets.sizes()["city"], 0);
    assert!(sets.contains("food", "bread"));
}

#[test]
fn test_load_topic_reads_single_topic() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "sport.json", r#"["Rugby"]"#);
    let loader = DatasetLoader::new(dir.path());
    assert_eq!(loader.load_topic("sport"), vec!["Rugby".to_string()]);
    assert!(loader.load_topic("name").is_empty());
}

#[test]
fn test_reload_swaps_sets_for_existing_readers() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(&dir, "animal.json", r#"["bear"]"#);
    let loader = DatasetLoader::new(dir.path());
    let shared = Arc::new(SharedWordSets::new(loader.load_all().unwrap()));
    let provider: Arc<dyn WordSetProvider> = shared.clone();

    assert!(!validate(provider.as_ref(), "animal", "b", "bison"));

    write(&dir, "extra/animal.txt", "bison\n");
    shared.replace(loader.load_all().unwrap());

    assert!(validate(provider.as_ref(), "animal", "b", "bison"));
    assert_eq!(shared.sizes()["animal"], 2);
}

#[test]
fn test_known_category_with_empty_list_rejects_everything() {
    let sets = WordSets::new().with_category("name", Vec::<String>::new());
    assert!(sets.has_category("name"));
    assert!(!validate(&sets, "name", "a", "anna"));
}
