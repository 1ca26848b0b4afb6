pub mod config;
pub mod error;
pub mod run;

use std::path::Path;

use config::ServerConfig;
pub use error::{Error, Result};
use revu_app::{
    mailer::Mailer,
    state::{AppConfig, AppState},
};
use revu_auth::{ConfirmationCodes, TokenManager};
use tokio::{fs, io::AsyncWriteExt as _};

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let app_config = AppConfig {
        default_page_size: config.default_page_size,
    };

    let pool = revu_dal::new_pool(&config.database_url()).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let secret = read_secret(&config.data_dir()).await?;
    let tokens = TokenManager::new(&secret, config.token_validity);
    let codes = ConfirmationCodes::new(&secret, config.code_validity);
    let mailer = Mailer::new(config.mail_from.clone());

    Ok(AppState::new(app_config, pool, tokens, codes, mailer))
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; 32]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Make sure the file is only accessible by the current user
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        random_bytes.as_ref().to_vec()
    };
    Ok(secret)
}
