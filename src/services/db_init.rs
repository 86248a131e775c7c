use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique email
    {
        let col = db.collection::<mongodb::bson::Document>("users");
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alert_history: per-user feed, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("alert_history");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "timestamp": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alert_configs are keyed by _id = user id, nothing extra to index

    Ok(())
}
