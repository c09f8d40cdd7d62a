mod common;

use chrono::{DateTime, Utc};
use common::{DATABASE, connect};
use docmap::{
    Concept, Connection, Entity, Fields, MemoryClient, MultipleEntitiesInOneCollection,
    mongodb::bson::{Document, doc},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn shared() -> (Arc<MemoryClient>, Connection) {
    connect(Arc::new(MultipleEntitiesInOneCollection))
}

fn stored(client: &MemoryClient) -> Document {
    let mut documents = client.documents(DATABASE, "Entities");
    assert_eq!(documents.len(), 1);
    documents.remove(0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Fields)]
struct Item {
    id: i64,
    name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
struct Cart {
    id: String,
    items: Vec<Item>,
    featured: Option<Item>,
}

#[tokio::test]
async fn numeric_nested_identifiers_come_back_as_numbers() {
    let (client, connection) = shared();
    let carts = connection.context::<Cart>().await.unwrap();

    let cart = Cart {
        id: "c1".into(),
        items: vec![
            Item {
                id: 5,
                name: "kettle".into(),
            },
            Item {
                id: 6,
                name: "mug".into(),
            },
        ],
        featured: Some(Item {
            id: 7,
            name: "teapot".into(),
        }),
    };
    carts.insert(&cart).await.unwrap();

    assert_eq!(
        stored(&client),
        doc! {
            "id": "c1",
            "items": [
                { "Id": "5", "name": "kettle" },
                { "Id": "6", "name": "mug" },
            ],
            "featured": { "Id": "7", "name": "teapot" },
            "_DOCUMENT_TYPE": "Cart",
        }
    );
    assert_eq!(carts.get_by_id("c1").await.unwrap(), Some(cart));
}

#[tokio::test]
async fn absent_nested_composites_stay_absent() {
    let (_, connection) = shared();
    let carts = connection.context::<Cart>().await.unwrap();

    let cart = Cart {
        id: "c2".into(),
        items: vec![],
        featured: None,
    };
    carts.insert(&cart).await.unwrap();

    assert_eq!(carts.get_by_id("c2").await.unwrap(), Some(cart));
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Fields)]
struct Tag {
    #[serde(rename = "ID")]
    key: String,
    label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
struct Post {
    id: String,
    tag: Tag,
}

#[tokio::test]
async fn renamed_nested_identifiers_keep_their_name() {
    let (client, connection) = shared();
    let posts = connection.context::<Post>().await.unwrap();

    let post = Post {
        id: "p1".into(),
        tag: Tag {
            key: "t1".into(),
            label: "news".into(),
        },
    };
    posts.insert(&post).await.unwrap();

    assert_eq!(
        stored(&client).get_document("tag").unwrap(),
        &doc! { "Id": "t1", "label": "news" }
    );
    assert_eq!(posts.get_by_id("p1").await.unwrap(), Some(post));
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
struct Event {
    id: String,
    at: DateTime<Utc>,
}

#[tokio::test]
async fn timestamps_round_trip() {
    let (client, connection) = shared();
    let events = connection.context::<Event>().await.unwrap();

    let event = Event {
        id: "e1".into(),
        at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    };
    events.insert(&event).await.unwrap();

    assert_eq!(
        stored(&client).get_str("at").unwrap(),
        "2023-11-14T22:13:20Z"
    );
    assert_eq!(events.get_by_id("e1").await.unwrap(), Some(event));
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Concept)]
struct Email(String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Entity)]
struct Profile {
    id: i64,
    email: Option<Email>,
    aliases: Vec<Email>,
}

#[tokio::test]
async fn wrapped_values_round_trip_inside_options_and_sequences() {
    let (client, connection) = shared();
    let profiles = connection.context::<Profile>().await.unwrap();

    let profile = Profile {
        id: 3,
        email: Some(Email::from("ada@example.com".to_owned())),
        aliases: vec![
            Email::from("a@example.com".to_owned()),
            Email::from("countess@example.com".to_owned()),
        ],
    };
    profiles.insert(&profile).await.unwrap();

    assert_eq!(
        stored(&client),
        doc! {
            "id": "3",
            "email": "ada@example.com",
            "aliases": ["a@example.com", "countess@example.com"],
            "_DOCUMENT_TYPE": "Profile",
        }
    );
    assert_eq!(profiles.get_by_id(&3_i64).await.unwrap(), Some(profile.clone()));

    let unset = Profile {
        id: 4,
        email: None,
        aliases: vec![],
    };
    profiles.insert(&unset).await.unwrap();
    assert_eq!(profiles.get_by_id(&4_i64).await.unwrap(), Some(unset));
}
