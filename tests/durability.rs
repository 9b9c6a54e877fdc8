// The durable engine must survive a close-and-reopen cycle, and schema
// initialization must be safe to repeat against an existing database.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use filmgraph::config::{Config, DatabaseConfig};
use filmgraph::model::{Film, Genre, Like, Rating, User};
use filmgraph::CatalogStore;

fn config_for(url: String) -> Config {
    Config {
        database: DatabaseConfig {
            url,
            max_connections: 1,
            acquire_timeout_secs: 5,
        },
    }
}

#[tokio::test]
async fn catalog_survives_reopen() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display());

    let film_id;
    let user_id;
    {
        let store = CatalogStore::connect(&config_for(url.clone())).await.unwrap();

        let payload = Film {
            id: None,
            name: "Moon".to_string(),
            description: "Three years alone on the far side.".to_string(),
            release_date: NaiveDate::from_ymd_opt(2009, 7, 17).unwrap(),
            duration: 97,
            rating: Some(Rating::new(4, "R")),
            genres: BTreeSet::from([Genre::new(2, "Drama")]),
            liked_by: BTreeSet::new(),
        };
        let saved = store.films.save(payload).await.unwrap();
        film_id = saved.id.unwrap();

        let u = User {
            id: None,
            email: "sam@lunar.example".to_string(),
            login: "sam".to_string(),
            name: String::new(),
            birthday: NaiveDate::from_ymd_opt(1976, 2, 21).unwrap(),
            friends: BTreeSet::new(),
            liked_films: BTreeSet::new(),
        };
        let saved_user = store.users.save(u).await.unwrap();
        user_id = saved_user.id.unwrap();
        store
            .likes
            .add(Like::new(user_id, film_id))
            .await
            .unwrap();
    }

    // Reconnecting re-runs initialization against the populated file.
    let store = CatalogStore::connect(&config_for(url)).await.unwrap();

    let film = store.films.find_by_id(film_id).await.unwrap().unwrap();
    assert_eq!(film.name, "Moon");
    assert_eq!(film.genres.len(), 1);
    assert!(film.liked_by.contains(&user_id));

    let user = store.users.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.name, "sam", "blank name was normalized before the row was written");
    assert!(user.liked_films.contains(&film_id));

    // Seeds are inserted idempotently, not duplicated.
    assert_eq!(store.genres.find_all().await.unwrap().len(), 6);
    assert_eq!(store.ratings.find_all().await.unwrap().len(), 5);
}
