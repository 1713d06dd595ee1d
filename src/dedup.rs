use crate::models::Article;
use crate::store::KnownUrlSet;
use std::collections::HashMap;

/// Keep one article per URL and drop URLs already in the store.
///
/// Within `batch` the last occurrence of a URL wins, but it takes the slot of
/// the first occurrence so the batch order is otherwise unchanged.
pub fn dedupe(batch: Vec<Article>, known: &KnownUrlSet) -> Vec<Article> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(batch.len());
    let mut unique: Vec<Article> = Vec::with_capacity(batch.len());

    for article in batch {
        match slots.get(&article.url) {
            Some(&idx) => unique[idx] = article,
            None => {
                slots.insert(article.url.clone(), unique.len());
                unique.push(article);
            }
        }
    }

    unique.retain(|article| !known.contains(&article.url));
    unique
}
