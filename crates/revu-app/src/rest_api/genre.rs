use revu_dal::genre::{CreateGenre, GenreRepository};

use crate::slug_value_api;

slug_value_api!(CreateGenre, GenreRepository);
