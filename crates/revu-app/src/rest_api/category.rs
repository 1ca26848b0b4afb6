use revu_dal::category::{CategoryRepository, CreateCategory};

use crate::slug_value_api;

slug_value_api!(CreateCategory, CategoryRepository);
