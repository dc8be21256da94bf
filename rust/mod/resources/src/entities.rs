//! The six record types and their lookup table.

use std::sync::Arc;

use ucsb_schema::{FieldDef, KeyDef, SchemaError};

use crate::entity::EntityDef;

pub fn help_request() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "HelpRequest",
        "/api/helprequests",
        "/helpRequest",
        KeyDef::id(),
        vec![
            FieldDef::text("requesterEmail", "Requester Email")
                .required_message("Requester Email is required.")
                .email()
                .with_message("Requester Email must be a valid email address"),
            FieldDef::text("teamId", "Team Id")
                .required_message("Team id is required.")
                .identifier()
                .with_message("Team Id must only contain numbers, letters, dash, and/or underscore."),
            FieldDef::text("tableOrBreakoutRoom", "Table or breakout room")
                .required()
                .max_length(100)
                .with_message("Table number or breakout room number must be at most 100 characters."),
            FieldDef::timestamp("requestTime", "Request time")
                .required()
                .pattern(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$")
                .with_message("Use YYYY-MM-DDTHH:MM:SS (e.g., 2025-10-28T17:35:00)."),
            FieldDef::text("explanation", "Explanation")
                .required()
                .min_length(10)
                .with_message("Explanation should be thorough and at least 10 characters.")
                .max_length(1200)
                .with_message("Explanation has a maximum of 1200 characters."),
            FieldDef::boolean("solved", "Solved").required(),
        ],
    )?
    .alias("helprequests")
    .alias("help")
    .messages(
        "New helpRequest Created - id: {id} requesterEmail: {requesterEmail}",
        "HelpRequest Updated - id: {id} requesterEmail: {requesterEmail}",
    ))
}

pub fn recommendation_request() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "RecommendationRequest",
        "/api/recommendationrequest",
        "/recommendationrequest",
        KeyDef::id(),
        vec![
            FieldDef::text("requesterEmail", "Requester Email").required().email(),
            FieldDef::text("professorEmail", "Professor Email").required().email(),
            FieldDef::text("explanation", "Explanation").required(),
            FieldDef::timestamp("dateRequested", "Date Requested").required(),
            FieldDef::timestamp("dateNeeded", "Date Needed").required(),
            FieldDef::boolean("done", "Done").required(),
        ],
    )?
    .alias("recommendationrequests")
    .alias("recommendations")
    .zulu("dateRequested")
    .zulu("dateNeeded")
    .key_in_update_body()
    .messages(
        "New recommendation request Created - id: {id} requesterEmail: {requesterEmail}",
        "Recommendation Request Updated - id: {id} Requester email: {requesterEmail}",
    ))
}

pub fn menu_item_review() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "MenuItemReview",
        "/api/menuitemreview",
        "/menuitemreview",
        KeyDef::id(),
        vec![
            FieldDef::integer("itemId", "Item Id").required_message("Item Id is required."),
            FieldDef::text("reviewerEmail", "Reviewer Email").required().email(),
            FieldDef::integer("stars", "Stars").required().range(0.0, 5.0),
            FieldDef::timestamp("dateReviewed", "Date Reviewed").required(),
            FieldDef::text("comments", "Comments").required(),
        ],
    )?
    .alias("menuitemreviews")
    .alias("reviews")
    .messages(
        "New menuItemReview Created - id: {id} itemId: {itemId}",
        "MenuItemReview Updated - id: {id} itemId: {itemId}",
    ))
}

pub fn dining_commons_menu_item() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "DiningCommonsMenuItem",
        "/api/UCSBDiningCommonsMenuItem",
        "/diningcommonsmenuitem",
        KeyDef::id(),
        vec![
            FieldDef::text("diningCommonsCode", "diningCommonsCode").required(),
            FieldDef::text("name", "Name")
                .required()
                .max_length(255)
                .with_message("Max length 255 characters"),
            FieldDef::text("station", "station").required(),
        ],
    )?
    .alias("diningcommonsmenuitems")
    .alias("ucsbdiningcommonsmenuitem")
    .alias("menuitems")
    .messages(
        "New ucsbDiningCommonsMenuItem Created - id: {id} name: {name}",
        "UCSBDiningCommonsMenuItem Updated - id: {id} name: {name}",
    ))
}

pub fn organization() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "Organization",
        "/api/ucsborganization",
        "/ucsborganizations",
        KeyDef::natural("orgCode"),
        vec![
            FieldDef::text("orgCode", "orgCode")
                .required()
                .max_length(3)
                .with_message("Max length 3 characters"),
            FieldDef::text("orgTranslationShort", "orgTranslationShort")
                .required()
                .max_length(15)
                .with_message("Max length 15 characters"),
            FieldDef::text("orgTranslation", "orgTranslation").required(),
            FieldDef::boolean("inactive", "inactive").required(),
        ],
    )?
    .alias("organizations")
    .alias("ucsborganization")
    .alias("ucsborganizations")
    .alias("orgs")
    .messages(
        "New UCSB Organization Created - orgCode: {orgCode} orgTranslationShort: {orgTranslationShort}",
        "UCSB Organization Updated - orgCode: {orgCode} orgTranslationShort: {orgTranslationShort}",
    ))
}

pub fn article() -> Result<EntityDef, SchemaError> {
    Ok(EntityDef::new(
        "Article",
        "/api/articles",
        "/articles",
        KeyDef::id(),
        vec![
            FieldDef::text("title", "Title").required(),
            FieldDef::text("url", "URL").required().url(),
            FieldDef::text("explanation", "Explanation").required(),
            FieldDef::text("email", "Email").required().email(),
            FieldDef::timestamp("dateAdded", "Date Added").required(),
        ],
    )?
    .alias("articles")
    .messages(
        "New article Created - id: {id} title: {title}",
        "Article Updated - id: {id} title: {title}",
    ))
}

/// Every entity the application manages, looked up by name or alias.
#[derive(Debug, Clone)]
pub struct Catalogue {
    entities: Vec<Arc<EntityDef>>,
}

impl Catalogue {
    pub fn standard() -> Result<Self, SchemaError> {
        let entities = vec![
            help_request()?,
            recommendation_request()?,
            menu_item_review()?,
            dining_commons_menu_item()?,
            organization()?,
            article()?,
        ];
        Ok(Self { entities: entities.into_iter().map(Arc::new).collect() })
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<EntityDef>> {
        self.entities.iter().find(|e| e.matches(name)).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntityDef>> {
        self.entities.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entities.iter().map(|e| e.name()).collect()
    }
}
