use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::{FilmRow, MemoryState};
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Film, Genre, Rating};
use crate::repository::Repository;

pub struct MemoryFilmRepository {
    state: Arc<MemoryState>,
}

impl MemoryFilmRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }

    fn row_from_payload(id: EntityId, film: &Film, genre_ids: BTreeSet<EntityId>) -> FilmRow {
        FilmRow {
            id,
            name: film.name.clone(),
            description: film.description.clone(),
            release_date: film.release_date,
            duration: film.duration,
            rating_id: film.rating.as_ref().map(|r| r.id),
            genre_ids,
        }
    }

    /// Join a stored row with its rating, genre and like data into a
    /// fresh aggregate. Unknown reference ids resolve to nothing, the
    /// same way the relational engine's LEFT JOINs do.
    async fn assemble(&self, row: &FilmRow) -> Film {
        let rating = match row.rating_id {
            Some(id) => {
                let ratings = self.state.ratings.read().await;
                ratings.get(&id).map(|name| Rating::new(id, name.clone()))
            }
            None => None,
        };

        let genres = {
            let names = self.state.genres.read().await;
            row.genre_ids
                .iter()
                .filter_map(|id| names.get(id).map(|name| Genre::new(*id, name.clone())))
                .collect()
        };

        let liked_by = {
            let likes = self.state.likes.read().await;
            likes
                .iter()
                .filter(|(_, film_id)| *film_id == row.id)
                .map(|(user_id, _)| *user_id)
                .collect()
        };

        Film {
            id: Some(row.id),
            name: row.name.clone(),
            description: row.description.clone(),
            release_date: row.release_date,
            duration: row.duration,
            rating,
            genres,
            liked_by,
        }
    }
}

#[async_trait]
impl Repository<Film> for MemoryFilmRepository {
    async fn save(&self, film: Film) -> StoreResult<Film> {
        let id = self.state.film_ids.next_id();
        let genre_ids = film.genres.iter().map(|g| g.id).collect();
        let row = Self::row_from_payload(id, &film, genre_ids);
        self.state.films.write().await.insert(id, row.clone());
        info!(film_id = id, name = %row.name, "film created");
        Ok(self.assemble(&row).await)
    }

    async fn update(&self, film: Film) -> StoreResult<Film> {
        let id = film.id.ok_or_else(|| {
            StoreError::NotFound(format!("film update without id: {:?}", film))
        })?;

        let row = {
            let mut films = self.state.films.write().await;
            let old = films.get(&id).ok_or_else(|| {
                StoreError::NotFound(format!("film update for unknown id {}: {:?}", id, film))
            })?;
            // An empty genre payload means "not supplied": the stored set
            // carries over.
            let genre_ids = if film.genres.is_empty() {
                old.genre_ids.clone()
            } else {
                film.genres.iter().map(|g| g.id).collect()
            };
            let row = Self::row_from_payload(id, &film, genre_ids);
            films.insert(id, row.clone());
            row
        };

        info!(film_id = id, "film updated");
        Ok(self.assemble(&row).await)
    }

    async fn delete(&self, film: &Film) -> StoreResult<Option<Film>> {
        let id = match film.id {
            Some(id) => id,
            None => return Ok(None),
        };

        let row = self.state.films.write().await.remove(&id);
        match row {
            Some(row) => {
                // Snapshot the aggregate before edge cleanup so the caller
                // sees the film as it was.
                let deleted = self.assemble(&row).await;
                self.state
                    .likes
                    .write()
                    .await
                    .retain(|(_, film_id)| *film_id != id);
                info!(film_id = id, "film deleted");
                Ok(Some(deleted))
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Film>> {
        let row = { self.state.films.read().await.get(&id).cloned() };
        match row {
            Some(row) => Ok(Some(self.assemble(&row).await)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> StoreResult<Vec<Film>> {
        let mut rows: Vec<FilmRow> = { self.state.films.read().await.values().cloned().collect() };
        rows.sort_by_key(|row| row.id);

        let mut films = Vec::with_capacity(rows.len());
        for row in &rows {
            films.push(self.assemble(row).await);
        }
        Ok(films)
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Film>> {
        let mut films = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(film) = self.find_by_id(*id).await? {
                films.push(film);
            }
        }
        Ok(films)
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Film>> {
        if n <= 0 {
            return Ok(Vec::new());
        }
        let mut films = self.find_all().await?;
        films.sort_by(|a, b| {
            b.liked_by
                .len()
                .cmp(&a.liked_by.len())
                .then(a.id.cmp(&b.id))
        });
        films.truncate(n as usize);
        Ok(films)
    }
}
