use crate::slug_value_repository;

slug_value_repository!(
    Category,
    CreateCategory,
    CategoryRepository,
    CategoryRepositoryImpl,
    "category"
);
