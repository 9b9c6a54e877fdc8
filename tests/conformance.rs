// Behavioral suite shared by both storage engines. Every test runs
// against the transient and the durable store and expects identical
// observable behavior from each.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use filmgraph::model::{EntityId, Film, Friendship, FriendshipStatus, Genre, Like, Rating, User};
use filmgraph::{CatalogStore, StoreError};

async fn backends() -> Vec<(&'static str, CatalogStore)> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    vec![
        ("memory", CatalogStore::in_memory()),
        (
            "sqlite",
            CatalogStore::sqlite_in_memory()
                .await
                .expect("sqlite store"),
        ),
    ]
}

fn film(name: &str) -> Film {
    Film {
        id: None,
        name: name.to_string(),
        description: format!("{} description", name),
        release_date: NaiveDate::from_ymd_opt(1999, 3, 31).unwrap(),
        duration: 136,
        rating: None,
        genres: BTreeSet::new(),
        liked_by: BTreeSet::new(),
    }
}

fn user(login: &str) -> User {
    User {
        id: None,
        email: format!("{}@example.com", login),
        login: login.to_string(),
        name: login.to_string(),
        birthday: NaiveDate::from_ymd_opt(1988, 7, 14).unwrap(),
        friends: BTreeSet::new(),
        liked_films: BTreeSet::new(),
    }
}

fn id_of_film(f: &Film) -> EntityId {
    f.id.expect("persisted film carries an id")
}

fn id_of_user(u: &User) -> EntityId {
    u.id.expect("persisted user carries an id")
}

#[tokio::test]
async fn saved_film_round_trips() {
    for (engine, store) in backends().await {
        let mut payload = film("The Matrix");
        payload.rating = Some(Rating::new(4, "R"));
        payload.genres = BTreeSet::from([Genre::new(4, "Thriller"), Genre::new(6, "Action")]);

        let saved = store.films.save(payload).await.unwrap();
        let id = id_of_film(&saved);

        let found = store.films.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found, saved, "{engine}: round-trip changed the film");
        assert_eq!(found.genres.len(), 2, "{engine}");
        assert_eq!(found.rating.as_ref().unwrap().name, "R", "{engine}");
        assert!(found.liked_by.is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn saved_user_round_trips() {
    for (engine, store) in backends().await {
        let saved = store.users.save(user("neo")).await.unwrap();
        let found = store
            .users
            .find_by_id(id_of_user(&saved))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, saved, "{engine}");
        assert!(found.friends.is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn like_edge_is_idempotent() {
    for (engine, store) in backends().await {
        let u = store.users.save(user("trinity")).await.unwrap();
        let f = store.films.save(film("Bound")).await.unwrap();
        let edge = Like::new(id_of_user(&u), id_of_film(&f));

        assert_eq!(
            store.likes.add(edge).await.unwrap(),
            Some(edge),
            "{engine}: first add must insert"
        );
        assert_eq!(
            store.likes.add(edge).await.unwrap(),
            None,
            "{engine}: second add must be a no-op"
        );
        assert_eq!(
            store.likes.for_film(id_of_film(&f)).await.unwrap().len(),
            1,
            "{engine}: duplicate add must not grow the edge set"
        );
        assert!(store.likes.exists(&edge).await.unwrap(), "{engine}");

        assert_eq!(store.likes.remove(&edge).await.unwrap(), Some(edge), "{engine}");
        assert_eq!(store.likes.remove(&edge).await.unwrap(), None, "{engine}");
        assert!(!store.likes.exists(&edge).await.unwrap(), "{engine}");
    }
}

#[tokio::test]
async fn deleting_a_film_cascades_its_edges() {
    for (engine, store) in backends().await {
        let mut payload = film("Se7en");
        payload.genres = BTreeSet::from([Genre::new(4, "Thriller"), Genre::new(2, "Drama")]);
        let f = store.films.save(payload).await.unwrap();
        let film_id = id_of_film(&f);

        let mut user_ids = Vec::new();
        for login in ["mills", "somerset", "tracy"] {
            let u = store.users.save(user(login)).await.unwrap();
            let uid = id_of_user(&u);
            store.likes.add(Like::new(uid, film_id)).await.unwrap();
            user_ids.push(uid);
        }

        let deleted = store.films.delete(&f).await.unwrap().unwrap();
        assert_eq!(
            deleted.liked_by.len(),
            3,
            "{engine}: delete must return the film as it was"
        );

        assert!(
            store.films.find_by_id(film_id).await.unwrap().is_none(),
            "{engine}"
        );
        assert!(
            store.likes.for_film(film_id).await.unwrap().is_empty(),
            "{engine}: like edges must not dangle"
        );
        for uid in user_ids {
            let u = store.users.find_by_id(uid).await.unwrap().unwrap();
            assert!(
                !u.liked_films.contains(&film_id),
                "{engine}: user {uid} still lists the deleted film"
            );
        }

        // Deleting again reports absence, not an error.
        assert!(store.films.delete(&f).await.unwrap().is_none(), "{engine}");
    }
}

#[tokio::test]
async fn deleting_a_user_cascades_both_friendship_directions() {
    for (engine, store) in backends().await {
        let a = store.users.save(user("ripley")).await.unwrap();
        let b = store.users.save(user("hicks")).await.unwrap();
        let c = store.users.save(user("bishop")).await.unwrap();
        let (a_id, b_id, c_id) = (id_of_user(&a), id_of_user(&b), id_of_user(&c));

        // a -> b, c -> a: one outgoing and one incoming edge around `a`.
        store
            .friendships
            .add(Friendship::requested(a_id, b_id))
            .await
            .unwrap();
        store
            .friendships
            .add(Friendship::requested(c_id, a_id))
            .await
            .unwrap();

        let f = store.films.save(film("Aliens")).await.unwrap();
        store
            .likes
            .add(Like::new(a_id, id_of_film(&f)))
            .await
            .unwrap();

        store.users.delete(&a).await.unwrap().unwrap();

        assert!(
            store
                .friendships
                .find(a_id, b_id)
                .await
                .unwrap()
                .is_none(),
            "{engine}: outgoing edge must be gone"
        );
        assert!(
            store
                .friendships
                .find(c_id, a_id)
                .await
                .unwrap()
                .is_none(),
            "{engine}: incoming edge must be gone"
        );
        let c_after = store.users.find_by_id(c_id).await.unwrap().unwrap();
        assert!(!c_after.friends.contains(&a_id), "{engine}");

        let film_after = store
            .films
            .find_by_id(id_of_film(&f))
            .await
            .unwrap()
            .unwrap();
        assert!(
            !film_after.liked_by.contains(&a_id),
            "{engine}: like edges of the deleted user must not dangle"
        );
    }
}

#[tokio::test]
async fn film_update_preserves_omitted_genres_and_derived_likes() {
    for (engine, store) in backends().await {
        let mut payload = film("Heat");
        payload.genres = BTreeSet::from([Genre::new(4, "Thriller"), Genre::new(2, "Drama")]);
        let saved = store.films.save(payload).await.unwrap();
        let film_id = id_of_film(&saved);

        let u = store.users.save(user("mccauley")).await.unwrap();
        store
            .likes
            .add(Like::new(id_of_user(&u), film_id))
            .await
            .unwrap();

        // Rename only; genre payload left empty.
        let mut patch = saved.clone();
        patch.name = "Heat (Director's Cut)".to_string();
        patch.genres = BTreeSet::new();
        patch.liked_by = BTreeSet::new();

        let updated = store.films.update(patch).await.unwrap();
        assert_eq!(updated.name, "Heat (Director's Cut)", "{engine}");
        assert_eq!(
            updated.genres.len(),
            2,
            "{engine}: omitted genres must carry over"
        );
        assert_eq!(
            updated.liked_by.len(),
            1,
            "{engine}: likes are derived and must survive updates"
        );
    }
}

#[tokio::test]
async fn film_update_replaces_supplied_genres() {
    for (engine, store) in backends().await {
        let mut payload = film("Snatch");
        payload.genres = BTreeSet::from([Genre::new(1, "Comedy")]);
        let saved = store.films.save(payload).await.unwrap();

        let mut patch = saved.clone();
        patch.genres = BTreeSet::from([Genre::new(4, "Thriller"), Genre::new(6, "Action")]);

        let updated = store.films.update(patch).await.unwrap();
        let genre_ids: Vec<EntityId> = updated.genres.iter().map(|g| g.id).collect();
        assert_eq!(genre_ids, vec![4, 6], "{engine}: supplied set must replace");
    }
}

#[tokio::test]
async fn user_update_keeps_derived_collections() {
    for (engine, store) in backends().await {
        let a = store.users.save(user("marge")).await.unwrap();
        let b = store.users.save(user("norm")).await.unwrap();
        let (a_id, b_id) = (id_of_user(&a), id_of_user(&b));

        store
            .friendships
            .add(Friendship::requested(a_id, b_id))
            .await
            .unwrap();
        let f = store.films.save(film("Fargo")).await.unwrap();
        store
            .likes
            .add(Like::new(a_id, id_of_film(&f)))
            .await
            .unwrap();

        let mut patch = a.clone();
        patch.email = "marge@brainerd.mn.us".to_string();
        patch.friends = BTreeSet::new();
        patch.liked_films = BTreeSet::new();

        let updated = store.users.update(patch).await.unwrap();
        assert_eq!(updated.email, "marge@brainerd.mn.us", "{engine}");
        assert!(updated.friends.contains(&b_id), "{engine}");
        assert!(updated.liked_films.contains(&id_of_film(&f)), "{engine}");
    }
}

#[tokio::test]
async fn update_of_unknown_id_reports_not_found() {
    for (engine, store) in backends().await {
        let missing = film("Ghost Entry").with_id(424242);
        match store.films.update(missing).await {
            Err(StoreError::NotFound(msg)) => {
                assert!(msg.contains("424242"), "{engine}: message must carry the id")
            }
            other => panic!("{engine}: expected NotFound, got {:?}", other.map(|f| f.id)),
        }

        let no_id = user("nobody");
        assert!(
            matches!(store.users.update(no_id).await, Err(StoreError::NotFound(_))),
            "{engine}: update without id must be NotFound"
        );
    }
}

#[tokio::test]
async fn find_by_ids_drops_unknown_and_keeps_request_order() {
    for (engine, store) in backends().await {
        let f1 = store.films.save(film("Alien")).await.unwrap();
        let f2 = store.films.save(film("Blade Runner")).await.unwrap();
        let (id1, id2) = (id_of_film(&f1), id_of_film(&f2));

        let found = store
            .films
            .find_by_ids(&[id2, 999_999, id1])
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Blade Runner", "Alien"], "{engine}");

        assert!(store.films.find_by_ids(&[]).await.unwrap().is_empty(), "{engine}");
    }
}

#[tokio::test]
async fn top_films_break_ties_by_ascending_id() {
    for (engine, store) in backends().await {
        let mut film_ids = Vec::new();
        for i in 1..=5 {
            let f = store.films.save(film(&format!("Film {i}"))).await.unwrap();
            film_ids.push(id_of_film(&f));
        }
        let mut user_ids = Vec::new();
        for i in 1..=5 {
            let u = store.users.save(user(&format!("critic{i}"))).await.unwrap();
            user_ids.push(id_of_user(&u));
        }

        // Like counts per film: 5, 5, 3, 1, 0.
        let counts = [5usize, 5, 3, 1, 0];
        for (film_idx, count) in counts.iter().enumerate() {
            for user_id in &user_ids[..*count] {
                store
                    .likes
                    .add(Like::new(*user_id, film_ids[film_idx]))
                    .await
                    .unwrap();
            }
        }

        let top4 = store.films.find_first_n_top_rows(4).await.unwrap();
        let top4_ids: Vec<EntityId> = top4.iter().map(id_of_film).collect();
        assert_eq!(
            top4_ids,
            vec![film_ids[0], film_ids[1], film_ids[2], film_ids[3]],
            "{engine}: equal counts must rank by ascending id"
        );

        let all = store.films.find_first_n_top_rows(10).await.unwrap();
        assert_eq!(all.len(), 5, "{engine}: n beyond the row count returns all");
        assert_eq!(id_of_film(all.last().unwrap()), film_ids[4], "{engine}");

        assert!(
            store.films.find_first_n_top_rows(0).await.unwrap().is_empty(),
            "{engine}"
        );
        assert!(
            store.films.find_first_n_top_rows(-3).await.unwrap().is_empty(),
            "{engine}"
        );
    }
}

#[tokio::test]
async fn top_films_follow_decreasing_like_frequency() {
    for (engine, store) in backends().await {
        let mut film_ids = Vec::new();
        for i in 1..=10 {
            let f = store.films.save(film(&format!("Feature {i}"))).await.unwrap();
            film_ids.push(id_of_film(&f));
        }
        let mut user_ids = Vec::new();
        for i in 1..=10 {
            let u = store.users.save(user(&format!("viewer{i}"))).await.unwrap();
            user_ids.push(id_of_user(&u));
        }

        // Film k (1-based) collects 11-k likes: 10, 9, ..., 1.
        for (idx, film_id) in film_ids.iter().enumerate() {
            for user_id in &user_ids[..10 - idx] {
                store.likes.add(Like::new(*user_id, *film_id)).await.unwrap();
            }
        }

        let top3 = store.films.find_first_n_top_rows(3).await.unwrap();
        let top3_ids: Vec<EntityId> = top3.iter().map(id_of_film).collect();
        assert_eq!(
            top3_ids,
            vec![film_ids[0], film_ids[1], film_ids[2]],
            "{engine}"
        );
    }
}

#[tokio::test]
async fn befriending_grows_only_the_initiator() {
    for (engine, store) in backends().await {
        let mut user_ids = Vec::new();
        for i in 1..=10 {
            let u = store.users.save(user(&format!("member{i}"))).await.unwrap();
            user_ids.push(id_of_user(&u));
        }
        let initiator = user_ids[0];

        for (step, friend_id) in user_ids[1..].iter().enumerate() {
            store
                .friendships
                .add(Friendship::requested(initiator, *friend_id))
                .await
                .unwrap();

            let me = store.users.find_by_id(initiator).await.unwrap().unwrap();
            assert_eq!(
                me.friends.len(),
                step + 1,
                "{engine}: friend count must grow by exactly one"
            );
            for other_id in &user_ids[1..] {
                let other = store.users.find_by_id(*other_id).await.unwrap().unwrap();
                assert!(
                    other.friends.is_empty(),
                    "{engine}: edge is written only from the initiating side"
                );
            }
        }

        let top = store.users.find_first_n_top_rows(1).await.unwrap();
        assert_eq!(id_of_user(&top[0]), initiator, "{engine}");
    }
}

#[tokio::test]
async fn friendship_add_is_idempotent_and_status_is_stored() {
    for (engine, store) in backends().await {
        let a = store.users.save(user("laurel")).await.unwrap();
        let b = store.users.save(user("hardy")).await.unwrap();
        let edge = Friendship::requested(id_of_user(&a), id_of_user(&b));

        let added = store.friendships.add(edge).await.unwrap().unwrap();
        assert_eq!(added.status, FriendshipStatus::Requested, "{engine}");
        assert_eq!(store.friendships.add(edge).await.unwrap(), None, "{engine}");

        let confirmed = store
            .friendships
            .set_status(edge.user_id, edge.friend_id, FriendshipStatus::Confirmed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(confirmed.status, FriendshipStatus::Confirmed, "{engine}");
        let found = store
            .friendships
            .find(edge.user_id, edge.friend_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, FriendshipStatus::Confirmed, "{engine}");

        // Status never restricts lookups or counts.
        let me = store.users.find_by_id(edge.user_id).await.unwrap().unwrap();
        assert!(me.friends.contains(&edge.friend_id), "{engine}");

        assert!(
            store
                .friendships
                .set_status(edge.friend_id, edge.user_id, FriendshipStatus::Confirmed)
                .await
                .unwrap()
                .is_none(),
            "{engine}: reverse edge was never written"
        );

        assert!(store.friendships.remove(&edge).await.unwrap().is_some(), "{engine}");
        assert!(store.friendships.remove(&edge).await.unwrap().is_none(), "{engine}");
    }
}

#[tokio::test]
async fn blank_user_name_defaults_to_login() {
    for (engine, store) in backends().await {
        let mut payload = user("zorg");
        payload.name = "   ".to_string();
        let saved = store.users.save(payload).await.unwrap();
        assert_eq!(saved.name, "zorg", "{engine}");

        let mut patch = saved.clone();
        patch.name = String::new();
        let updated = store.users.update(patch).await.unwrap();
        assert_eq!(updated.name, "zorg", "{engine}");
    }
}

#[tokio::test]
async fn reference_data_is_seeded_and_ids_continue_past_it() {
    for (engine, store) in backends().await {
        let genres = store.genres.find_all().await.unwrap();
        let genre_ids: Vec<EntityId> = genres.iter().map(|g| g.id).collect();
        assert_eq!(genre_ids, vec![1, 2, 3, 4, 5, 6], "{engine}");

        let ratings = store.ratings.find_all().await.unwrap();
        assert_eq!(ratings.len(), 5, "{engine}");
        assert_eq!(ratings[0].name, "G", "{engine}");

        let saved_genre = store
            .genres
            .save(Genre::new(0, "Film noir"))
            .await
            .unwrap();
        assert_eq!(saved_genre.id, 7, "{engine}: ids start past the seed range");

        let saved_rating = store.ratings.save(Rating::new(0, "NR")).await.unwrap();
        assert_eq!(saved_rating.id, 6, "{engine}");

        let some = store.genres.find_by_ids(&[2, 99, 5]).await.unwrap();
        let names: Vec<&str> = some.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Drama", "Documentary"], "{engine}");
    }
}

#[tokio::test]
async fn genre_and_rating_ranking_follow_usage() {
    for (engine, store) in backends().await {
        // Two thrillers, one drama; both thrillers rated R, the drama PG.
        let mut one = film("Ronin");
        one.genres = BTreeSet::from([Genre::new(4, "Thriller")]);
        one.rating = Some(Rating::new(4, "R"));
        let mut two = film("Nikita");
        two.genres = BTreeSet::from([Genre::new(4, "Thriller")]);
        two.rating = Some(Rating::new(4, "R"));
        let mut three = film("Big Fish");
        three.genres = BTreeSet::from([Genre::new(2, "Drama")]);
        three.rating = Some(Rating::new(2, "PG"));

        for payload in [one, two, three] {
            store.films.save(payload).await.unwrap();
        }

        let top_genres = store.genres.find_first_n_top_rows(2).await.unwrap();
        let ids: Vec<EntityId> = top_genres.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![4, 2], "{engine}: usage then ascending id");

        let top_ratings = store.ratings.find_first_n_top_rows(2).await.unwrap();
        let ids: Vec<EntityId> = top_ratings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2], "{engine}");

        // Unused reference rows still participate with count zero.
        let all_genres = store.genres.find_first_n_top_rows(100).await.unwrap();
        assert_eq!(all_genres.len(), 6, "{engine}");
    }
}

#[tokio::test]
async fn deleting_a_genre_detaches_it_from_films() {
    for (engine, store) in backends().await {
        let mut payload = film("Airplane!");
        payload.genres = BTreeSet::from([Genre::new(1, "Comedy"), Genre::new(6, "Action")]);
        let saved = store.films.save(payload).await.unwrap();

        let comedy = store.genres.find_by_id(1).await.unwrap().unwrap();
        store.genres.delete(&comedy).await.unwrap().unwrap();

        let after = store
            .films
            .find_by_id(id_of_film(&saved))
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<EntityId> = after.genres.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![6], "{engine}: deleted genre must detach");
    }
}

#[tokio::test]
async fn deleting_a_rating_leaves_films_unrated() {
    for (engine, store) in backends().await {
        let mut payload = film("Mad Max");
        payload.rating = Some(Rating::new(4, "R"));
        let saved = store.films.save(payload).await.unwrap();

        let r = store.ratings.find_by_id(4).await.unwrap().unwrap();
        store.ratings.delete(&r).await.unwrap().unwrap();

        let after = store
            .films
            .find_by_id(id_of_film(&saved))
            .await
            .unwrap()
            .unwrap();
        assert!(after.rating.is_none(), "{engine}");
    }
}

#[tokio::test]
async fn find_all_assembles_full_aggregates() {
    for (engine, store) in backends().await {
        let mut payload = film("Leon");
        payload.genres = BTreeSet::from([Genre::new(4, "Thriller")]);
        let f = store.films.save(payload).await.unwrap();
        let u = store.users.save(user("mathilda")).await.unwrap();
        store
            .likes
            .add(Like::new(id_of_user(&u), id_of_film(&f)))
            .await
            .unwrap();

        let all = store.films.find_all().await.unwrap();
        assert_eq!(all.len(), 1, "{engine}");
        assert_eq!(all[0].genres.len(), 1, "{engine}: find_all must assemble genres");
        assert_eq!(all[0].liked_by.len(), 1, "{engine}: find_all must assemble likes");

        let ranked = store.films.find_first_n_top_rows(1).await.unwrap();
        assert_eq!(
            ranked[0], all[0],
            "{engine}: ranked reads assemble the same aggregate"
        );
    }
}
