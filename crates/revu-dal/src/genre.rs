use crate::slug_value_repository;

slug_value_repository!(Genre, CreateGenre, GenreRepository, GenreRepositoryImpl, "genre");
