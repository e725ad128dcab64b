//! In-memory catalog, optionally loaded from a JSON file.

use std::path::Path;

use tracing::info;

use super::{sort_by_title, Game, GameCatalog, PRIMARY_SOURCE_LABEL, SECONDARY_SOURCE_LABEL};
use crate::error::{BridgeError, Result};

/// Catalog held in memory.
///
/// Every record is stamped with the catalog's source label on construction.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    label: String,
    games: Vec<Game>,
}

impl MemoryCatalog {
    pub fn new(label: impl Into<String>, games: Vec<Game>) -> Self {
        let label = label.into();
        let games = games
            .into_iter()
            .map(|mut g| {
                g.source = Some(label.clone());
                g
            })
            .collect();
        Self { label, games }
    }

    /// Loads a JSON array of records from `path`.
    ///
    /// # Errors
    /// `BridgeError::Catalog` if the file is unreadable or not a record array.
    pub fn from_json_file(label: impl Into<String>, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Catalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let games: Vec<Game> = serde_json::from_str(&content).map_err(|e| {
            BridgeError::Catalog(format!("invalid records in {}: {}", path.display(), e))
        })?;
        let catalog = Self::new(label, games);
        info!(
            component = "catalog",
            source = %catalog.label,
            path = %path.display(),
            records = catalog.games.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Built-in records of the primary backend.
    pub fn primary_seed() -> Self {
        let games = vec![
            Game::new(1, "Elden Ring", "RolePlaying", 59.99, 10)
                .released(2022, 2, 25)
                .with_rating("M")
                .with_description(
                    "An open-world action RPG created in collaboration with George R.R. Martin",
                )
                .with_studio("FromSoftware", "FromSoftware")
                .on_platforms(["PlayStation 5", "Xbox Series X", "Windows PC"])
                .with_features(["Online Multiplayer"]),
            Game::new(2, "Call of Duty: Modern Warfare", "Action", 69.99, 15)
                .released(2019, 10, 25)
                .with_rating("M")
                .with_description("First-person shooter developed by Infinity Ward")
                .with_studio("Activision", "Infinity Ward")
                .on_platforms(["PlayStation 5", "Xbox Series X", "Windows PC"])
                .with_features(["Online Multiplayer", "Campaign Mode"]),
            Game::new(3, "Animal Crossing: New Horizons", "Simulation", 49.99, 20)
                .released(2020, 3, 20)
                .with_rating("E")
                .with_description("Life simulation game developed by Nintendo")
                .with_studio("Nintendo", "Nintendo")
                .on_platforms(["Nintendo Switch"])
                .with_features(["Online Multiplayer", "Seasonal Events"]),
        ];
        Self::new(PRIMARY_SOURCE_LABEL, games)
    }

    /// Built-in records of the secondary backend.
    pub fn secondary_seed() -> Self {
        let games = vec![
            Game::new(101, "Elden Ring", "RolePlaying", 54.99, 4)
                .released(2022, 2, 25)
                .with_rating("M")
                .with_studio("Bandai Namco", "FromSoftware")
                .on_platforms(["PlayStation 5", "Windows PC"]),
            Game::new(
                102,
                "The Legend of Zelda: Breath of the Wild",
                "ActionAdventure",
                59.99,
                8,
            )
            .released(2017, 3, 3)
            .with_rating("E10+")
            .with_description("Open-air adventure across the kingdom of Hyrule")
            .with_studio("Nintendo", "Nintendo EPD")
            .on_platforms(["Nintendo Switch"]),
            Game::new(103, "Hollow Knight", "Metroidvania", 14.99, 12)
                .released(2017, 2, 24)
                .with_rating("E10+")
                .with_studio("Team Cherry", "Team Cherry")
                .on_platforms(["Nintendo Switch", "Windows PC"]),
            Game::new(104, "Stardew Valley", "Simulation", 14.99, 25)
                .released(2016, 2, 26)
                .with_rating("E")
                .with_studio("ConcernedApe", "ConcernedApe")
                .on_platforms(["Nintendo Switch", "Windows PC"])
                .with_features(["Online Multiplayer"]),
        ];
        Self::new(SECONDARY_SOURCE_LABEL, games)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameCatalog for MemoryCatalog {
    fn find_by_title(&self, title: &str) -> Result<Option<Game>> {
        Ok(self.games.iter().find(|g| g.title_matches(title)).cloned())
    }

    fn list_all(&self) -> Result<Vec<Game>> {
        let mut games = self.games.clone();
        sort_by_title(&mut games);
        Ok(games)
    }

    fn source_label(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_are_labelled() {
        let primary = MemoryCatalog::primary_seed();
        assert_eq!(primary.len(), 3);
        assert!(primary
            .list_all()
            .unwrap()
            .iter()
            .all(|g| g.source.as_deref() == Some(PRIMARY_SOURCE_LABEL)));

        let secondary = MemoryCatalog::secondary_seed();
        assert_eq!(secondary.source_label(), SECONDARY_SOURCE_LABEL);
        assert_eq!(secondary.len(), 4);
    }

    #[test]
    fn test_find_by_title_substring_case_insensitive() {
        let catalog = MemoryCatalog::primary_seed();
        let game = catalog.find_by_title("\"animal crossing\"").unwrap().unwrap();
        assert_eq!(game.title, "Animal Crossing: New Horizons");
        assert!(catalog.find_by_title("Hollow Knight").unwrap().is_none());
        assert!(catalog.find_by_title("").unwrap().is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let catalog = MemoryCatalog::new(
            "test",
            vec![
                Game::new(1, "Dark Souls II", "RPG", 1.0, 1),
                Game::new(2, "Dark Souls", "RPG", 1.0, 1),
            ],
        );
        assert_eq!(catalog.find_by_title("dark souls").unwrap().unwrap().id, 1);
    }

    #[test]
    fn test_list_all_sorted() {
        let catalog = MemoryCatalog::secondary_seed();
        let titles: Vec<_> = catalog
            .list_all()
            .unwrap()
            .into_iter()
            .map(|g| g.title)
            .collect();
        assert_eq!(
            titles,
            [
                "Elden Ring",
                "Hollow Knight",
                "Stardew Valley",
                "The Legend of Zelda: Breath of the Wild"
            ]
        );
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        std::fs::write(
            &path,
            r#"[{"id":9,"title":"Celeste","genre":"Platformer","price":19.99,"stock":2,"source":"stale"}]"#,
        )
        .unwrap();

        let catalog = MemoryCatalog::from_json_file("Local File", &path).unwrap();
        let game = catalog.find_by_title("celeste").unwrap().unwrap();
        assert_eq!(game.source.as_deref(), Some("Local File"));
    }

    #[test]
    fn test_from_json_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            MemoryCatalog::from_json_file("x", &missing),
            Err(BridgeError::Catalog(_))
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"not":"an array"}"#).unwrap();
        let err = MemoryCatalog::from_json_file("x", &bad).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
