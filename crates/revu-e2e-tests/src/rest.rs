use anyhow::Result;
use reqwest::Url;
use revu_dal::{category::Category, genre::Genre, review::Review, title::Title};
use serde_json::json;
use tracing::info;

pub async fn create_category(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Category> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("v1/categories").unwrap();

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_category: Category = response.json().await?;
    Ok(new_category)
}

pub async fn create_genre(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    slug: &str,
) -> Result<Genre> {
    let payload = json!({"name": name, "slug": slug});
    let api_url = base_url.join("v1/genres").unwrap();

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    assert!(response.status().is_success());

    let new_genre: Genre = response.json().await?;
    Ok(new_genre)
}

pub async fn create_title<T>(client: &reqwest::Client, base_url: &Url, payload: &T) -> Result<Title>
where
    T: serde::Serialize,
{
    let api_url = base_url.join("v1/titles").unwrap();

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_title: Title = response.json().await?;
    Ok(new_title)
}

pub async fn create_review(
    client: &reqwest::Client,
    base_url: &Url,
    title_id: i64,
    text: &str,
    score: i64,
) -> Result<Review> {
    let payload = json!({"text": text, "score": score});
    let api_url = base_url.join(&format!("v1/titles/{title_id}/reviews"))?;

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_review: Review = response.json().await?;
    Ok(new_review)
}
