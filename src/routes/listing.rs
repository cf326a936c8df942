use actix_web::{web, HttpResponse, Responder};
use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use mongodb::{options::ReturnDocument, Client};
use std::sync::Arc;

use crate::{
    db::mongo::{DATABASE, LISTINGS_COLLECTION},
    models::{
        geo::GeoPoint,
        listing::{Listing, ListingInput},
    },
    services::geocoding_service::{GeocodingService, NominatimTransport},
};

const MAX_NEARBY_DISTANCE_METERS: i32 = 50_000;

type Geocoder = GeocodingService<NominatimTransport>;

fn listings(client: &Client) -> mongodb::Collection<Listing> {
    client.database(DATABASE).collection(LISTINGS_COLLECTION)
}

#[derive(serde::Deserialize)]
pub struct ListParams {
    tag: Option<String>,
}

/*
    GET /api/listings
*/
pub async fn get_all(data: web::Data<Arc<Client>>, params: web::Query<ListParams>) -> impl Responder {
    let client = data.into_inner();
    let collection = listings(&client);

    let filter = match &params.tag {
        Some(tag) if !tag.is_empty() => doc! { "tags": tag },
        _ => doc! {},
    };

    match collection.find(filter).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Listing>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Failed to collect documents: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to collect listings.")
            }
        },
        Err(err) => {
            eprintln!("Failed to find documents: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to find listings.")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/*
    GET /api/listings/search?q=
*/
pub async fn search(
    data: web::Data<Arc<Client>>,
    params: web::Query<SearchParams>,
) -> impl Responder {
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    if query.is_empty() {
        return HttpResponse::BadRequest().body("Please enter a search term.");
    }

    let client = data.into_inner();
    let pattern = regex::escape(&query);
    let filter = doc! {
        "$or": [
            { "title": { "$regex": pattern.clone(), "$options": "i" } },
            { "country": { "$regex": pattern, "$options": "i" } },
        ]
    };

    match listings(&client).find(filter).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Listing>>().await {
            Ok(results) if results.is_empty() => HttpResponse::NotFound().body("No listing found"),
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Failed to collect documents: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to search listings.")
            }
        },
        Err(err) => {
            eprintln!("Failed to find documents: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to search listings.")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct NearbyParams {
    lng: f64,
    lat: f64,
}

/*
    GET /api/listings/nearby?lng=&lat=

    Requires the 2dsphere index on geometry (created at startup).
*/
pub async fn nearby(
    data: web::Data<Arc<Client>>,
    params: web::Query<NearbyParams>,
) -> impl Responder {
    let center = match GeoPoint::new(params.lng, params.lat) {
        Some(point) => point,
        None => return HttpResponse::BadRequest().body("Invalid coordinates"),
    };
    let geometry = match bson::to_bson(&center) {
        Ok(geometry) => geometry,
        Err(err) => {
            eprintln!("Failed to serialize query point: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to find nearby listings.");
        }
    };

    let client = data.into_inner();
    let filter = doc! {
        "geometry": {
            "$near": {
                "$geometry": geometry,
                "$maxDistance": MAX_NEARBY_DISTANCE_METERS,
            }
        }
    };

    match listings(&client).find(filter).await {
        Ok(cursor) => match cursor.try_collect::<Vec<Listing>>().await {
            Ok(results) => HttpResponse::Ok().json(results),
            Err(err) => {
                eprintln!("Failed to collect documents: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to find nearby listings.")
            }
        },
        Err(err) => {
            eprintln!("Failed to find documents: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to find nearby listings.")
        }
    }
}

/*
    GET /api/listings/{id}
*/
pub async fn get_by_id(path: web::Path<String>, data: web::Data<Arc<Client>>) -> impl Responder {
    let id = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let client = data.into_inner();
    match listings(&client).find_one(doc! { "_id": id }).await {
        Ok(Some(listing)) => HttpResponse::Ok().json(listing),
        Ok(None) => HttpResponse::NotFound().body("Listing not found"),
        Err(err) => {
            eprintln!("Failed to retrieve listing: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to retrieve listing")
        }
    }
}

/*
    POST /api/listings

    The location string is geocoded before the insert; a geocoding failure
    never fails the request, the listing just gets the fallback point.
*/
pub async fn create(
    data: web::Data<Arc<Client>>,
    geocoder: web::Data<Geocoder>,
    input: web::Json<ListingInput>,
) -> impl Responder {
    let input = input.into_inner();
    if let Err(message) = input.validate() {
        return HttpResponse::BadRequest().body(message);
    }
    let owner = match &input.owner {
        Some(raw) => match ObjectId::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => return HttpResponse::BadRequest().body("Invalid owner ID"),
        },
        None => None,
    };

    let geometry = geocoder.resolve(&input.location).await;
    let now = DateTime::now();
    let tags = input.normalized_tags();
    let mut listing = Listing {
        id: None,
        title: input.title,
        description: input.description,
        price: input.price,
        location: input.location,
        country: input.country,
        image: Vec::new(),
        geometry,
        likes: 0,
        liked_by: Vec::new(),
        tags,
        owner,
        created_at: Some(now),
        updated_at: Some(now),
    };

    let client = data.into_inner();
    match listings(&client).insert_one(&listing).await {
        Ok(result) => {
            listing.id = result.inserted_id.as_object_id();
            HttpResponse::Ok().json(listing)
        }
        Err(err) => {
            eprintln!("Failed to insert document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create listing.")
        }
    }
}

/*
    PUT /api/listings/{id}

    Re-geocodes the (possibly changed) location string, same policy as create.
*/
pub async fn update(
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
    geocoder: web::Data<Geocoder>,
    input: web::Json<ListingInput>,
) -> impl Responder {
    let id = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };
    let input = input.into_inner();
    if let Err(message) = input.validate() {
        return HttpResponse::BadRequest().body(message);
    }

    let client = data.into_inner();
    let collection = listings(&client);
    let mut listing = match collection.find_one(doc! { "_id": id }).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return HttpResponse::NotFound().body("Listing not found"),
        Err(err) => {
            eprintln!("Failed to retrieve listing: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to update listing.");
        }
    };

    listing.geometry = geocoder.resolve(&input.location).await;
    listing.tags = input.normalized_tags();
    listing.title = input.title;
    listing.description = input.description;
    listing.price = input.price;
    listing.location = input.location;
    listing.country = input.country;
    listing.updated_at = Some(DateTime::now());

    match collection.replace_one(doc! { "_id": id }, &listing).await {
        Ok(_) => HttpResponse::Ok().json(listing),
        Err(err) => {
            eprintln!("Failed to replace document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to update listing.")
        }
    }
}

/*
    DELETE /api/listings/{id}
*/
pub async fn delete(path: web::Path<String>, data: web::Data<Arc<Client>>) -> impl Responder {
    let id = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let client = data.into_inner();
    match listings(&client).delete_one(doc! { "_id": id }).await {
        Ok(result) if result.deleted_count == 0 => {
            HttpResponse::NotFound().body("Listing not found")
        }
        Ok(_) => HttpResponse::Ok().body("Listing deleted"),
        Err(err) => {
            eprintln!("Failed to delete document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to delete listing.")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct LikeInput {
    pub user_id: String,
}

/*
    POST /api/listings/{id}/like

    Membership toggle: un-likes when the user already liked the listing.
    Each branch folds the membership check into the update filter, so
    concurrent toggles from the same user cannot double-count.
*/
pub async fn toggle_like(
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
    input: web::Json<LikeInput>,
) -> impl Responder {
    let id = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };
    let user_id = match ObjectId::parse_str(&input.user_id) {
        Ok(user_id) => user_id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    let client = data.into_inner();
    let collection = listings(&client);

    // Un-like first: matches only when the user is already in liked_by.
    match collection
        .find_one_and_update(unlike_filter(id, user_id), unlike_update(user_id))
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(listing)) => {
            return HttpResponse::Ok().json(serde_json::json!({
                "likes": display_likes(listing.likes),
                "liked": false,
            }))
        }
        Ok(None) => {}
        Err(err) => {
            eprintln!("Failed to update document: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to like listing.");
        }
    }

    match collection
        .find_one_and_update(like_filter(id, user_id), like_update(user_id))
        .return_document(ReturnDocument::After)
        .await
    {
        Ok(Some(listing)) => HttpResponse::Ok().json(serde_json::json!({
            "likes": display_likes(listing.likes),
            "liked": true,
        })),
        Ok(None) => HttpResponse::NotFound().body("Listing not found"),
        Err(err) => {
            eprintln!("Failed to update document: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to like listing.")
        }
    }
}

fn unlike_filter(id: ObjectId, user_id: ObjectId) -> Document {
    doc! { "_id": id, "liked_by": user_id }
}

fn unlike_update(user_id: ObjectId) -> Document {
    doc! { "$inc": { "likes": -1 }, "$pull": { "liked_by": user_id } }
}

fn like_filter(id: ObjectId, user_id: ObjectId) -> Document {
    doc! { "_id": id, "liked_by": { "$ne": user_id } }
}

fn like_update(user_id: ObjectId) -> Document {
    doc! { "$inc": { "likes": 1 }, "$addToSet": { "liked_by": user_id } }
}

/// Clamps the counter for the response; an inconsistent stored document
/// must not surface a negative like count.
fn display_likes(likes: i64) -> i64 {
    likes.max(0)
}
