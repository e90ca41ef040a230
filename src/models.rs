use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::fields::FieldReader;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "cast_member_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CastMemberType {
    Director,
    Actor,
}

impl FromStr for CastMemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIRECTOR" => Ok(CastMemberType::Director),
            "ACTOR" => Ok(CastMemberType::Actor),
            _ => Err(format!("unknown cast member type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CastMember {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub member_type: CastMemberType,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Age rating of a video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "video_rating")]
pub enum Rating {
    #[sqlx(rename = "L")]
    #[serde(rename = "L")]
    Free,
    #[sqlx(rename = "10")]
    #[serde(rename = "10")]
    Ten,
    #[sqlx(rename = "12")]
    #[serde(rename = "12")]
    Twelve,
    #[sqlx(rename = "14")]
    #[serde(rename = "14")]
    Fourteen,
    #[sqlx(rename = "16")]
    #[serde(rename = "16")]
    Sixteen,
    #[sqlx(rename = "18")]
    #[serde(rename = "18")]
    Eighteen,
}

impl Rating {
    pub const ALL: [Rating; 6] = [
        Rating::Free,
        Rating::Ten,
        Rating::Twelve,
        Rating::Fourteen,
        Rating::Sixteen,
        Rating::Eighteen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Free => "L",
            Rating::Ten => "10",
            Rating::Twelve => "12",
            Rating::Fourteen => "14",
            Rating::Sixteen => "16",
            Rating::Eighteen => "18",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.as_str() == s)
            .ok_or_else(|| format!("unknown rating: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub year_launched: i32,
    pub opened: bool,
    pub rating: Rating,
    pub duration: i32,
    pub thumb_file: Option<String>,
    pub video_file: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct GenreResource {
    #[serde(flatten)]
    pub genre: Genre,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct VideoResource {
    #[serde(flatten)]
    pub video: Video,
    pub categories: Vec<Category>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "The name may not be greater than 255 characters."))]
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl CategoryRequest {
    pub fn from_json(body: serde_json::Value) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(body)?;
        let request = Self {
            name: fields.required_string("name"),
            description: fields.string("description"),
            is_active: fields.boolean("is_active", true),
        };
        fields.finish(request)
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct GenreRequest {
    #[validate(length(min = 1, max = 255, message = "The name may not be greater than 255 characters."))]
    pub name: String,
    pub is_active: bool,
    #[validate(length(min = 1, message = "The categories_id field is required."))]
    pub categories_id: Vec<Uuid>,
}

impl GenreRequest {
    pub fn from_json(body: serde_json::Value) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(body)?;
        let name = fields.required_string("name");
        let is_active = fields.boolean("is_active", true);
        let categories_id = fields.uuid_list("categories_id");
        if categories_id.is_none() {
            fields.fail("categories_id", "The categories_id field is required.".to_string());
        }
        fields.finish(Self {
            name,
            is_active,
            categories_id: categories_id.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CastMemberRequest {
    #[validate(length(min = 1, max = 255, message = "The name may not be greater than 255 characters."))]
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: CastMemberType,
}

impl CastMemberRequest {
    pub fn from_json(body: serde_json::Value) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(body)?;
        let name = fields.required_string("name");
        let member_type = fields.required_choice::<CastMemberType>("type");
        fields.finish(Self {
            name,
            // placeholder only reached when "type" already carries an error
            member_type: member_type.unwrap_or(CastMemberType::Actor),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// Body of a video create/update. On update an omitted association list
/// leaves the stored associations untouched.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct VideoRequest {
    #[validate(length(min = 1, max = 255, message = "The title may not be greater than 255 characters."))]
    pub title: String,
    #[validate(length(min = 1, message = "The description field is required."))]
    pub description: String,
    #[validate(range(min = 1000, max = 9999, message = "The year_launched must be a four-digit year."))]
    pub year_launched: i32,
    pub opened: bool,
    pub rating: Rating,
    #[validate(range(min = 1, message = "The duration must be at least 1."))]
    pub duration: i32,
    #[validate(length(min = 1, message = "The categories_id field is required."))]
    pub categories_id: Option<Vec<Uuid>>,
    #[validate(length(min = 1, message = "The genres_id field is required."))]
    pub genres_id: Option<Vec<Uuid>>,
}

impl VideoRequest {
    /// Both association lists are required on create.
    pub fn from_json(body: serde_json::Value, mode: WriteMode) -> Result<Self, AppError> {
        let mut fields = FieldReader::new(body)?;
        let title = fields.required_string("title");
        let description = fields.required_string("description");
        let year_launched = fields.required_integer("year_launched");
        let opened = fields.boolean("opened", false);
        let rating = fields.required_choice::<Rating>("rating");
        let duration = fields.required_integer("duration");
        let categories_id = fields.uuid_list("categories_id");
        let genres_id = fields.uuid_list("genres_id");

        if mode == WriteMode::Create {
            for (name, list) in [("categories_id", &categories_id), ("genres_id", &genres_id)] {
                if list.is_none() && !fields.has_error(name) {
                    fields.fail(name, format!("The {} field is required.", name));
                }
            }
        }

        fields.finish(Self {
            title,
            description,
            year_launched,
            opened,
            rating: rating.unwrap_or(Rating::Free),
            duration,
            categories_id,
            genres_id,
        })
    }
}
