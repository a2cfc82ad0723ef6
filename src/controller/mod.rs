//! Block command handling
//!
//! [`BlockController`] runs one [`Command`] for one block kind against the
//! current learnplace. It sits where a host request handler would: it checks
//! permissions through the host's [`AccessGuard`], parses forms, calls the
//! services, and answers with an [`Outcome`] the host renders or follows.
//!
//! ## Query keys
//!
//! - `position` - insert position for `create` (absent appends)
//! - `accordion` - accordion the new block goes into
//! - `block` - block for `edit`, `confirm` and `delete`

pub mod command;
pub mod form;
pub mod outcome;

pub use command::Command;
pub use form::BlockForm;
pub use outcome::{Flash, Outcome, RedirectTarget, View};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::collection::{clamp_position, BlockCollection};
use crate::error::LearnplaceError;
use crate::model::{Block, BlockContent, BlockKind, Container, Entity, UNASSIGNED_ID};
use crate::security::{AccessGuard, Permission};
use crate::services::Services;

use outcome::{MSG_DELETE_SUCCESS, MSG_SAVE_SUCCESS};

pub const QUERY_POSITION: &str = "position";
pub const QUERY_ACCORDION: &str = "accordion";
pub const QUERY_BLOCK: &str = "block";

/// A host request addressed to a block controller
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Ref id of the learnplace object in the host repository
    pub ref_id: i64,
    pub object_id: i64,
    /// Command name; `index` when absent
    pub command: Option<String>,
    pub query: BTreeMap<String, String>,
    /// Posted form for `create` and `update`
    pub form: Option<BlockForm>,
}

impl Request {
    pub fn new(ref_id: i64, object_id: i64, command: Command) -> Self {
        Self {
            ref_id,
            object_id,
            command: Some(command.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_form(mut self, form: BlockForm) -> Self {
        self.form = Some(form);
        self
    }

    fn query_id(&self, key: &str) -> i64 {
        self.query
            .get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(UNASSIGNED_ID)
    }

    /// Requested insert position clamped into `0..=len`; appends when absent
    fn insert_position(&self, len: usize) -> usize {
        match self.query.get(QUERY_POSITION).and_then(|v| v.trim().parse::<i64>().ok()) {
            Some(position) => clamp_position(position, len),
            None => len,
        }
    }
}

pub struct BlockController {
    kind: BlockKind,
    services: Arc<Services>,
    guard: Arc<dyn AccessGuard>,
}

impl BlockController {
    pub fn new(kind: BlockKind, services: Arc<Services>, guard: Arc<dyn AccessGuard>) -> Self {
        Self { kind, services, guard }
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Run the request's command
    ///
    /// Never fails: errors end up as a failure flash on a redirect, and
    /// validation errors re-render the submitted form.
    pub fn execute(&self, request: &Request) -> Outcome {
        let name = request.command.as_deref().unwrap_or(Command::Index.as_str());
        let command = match name.parse::<Command>() {
            Ok(command) => command,
            Err(_) => {
                warn!(command = name, ref_id = request.ref_id, "Unknown block command");
                return Outcome::access_denied();
            }
        };

        if let Err(e) = self.authorize(command, request.ref_id) {
            warn!(command = %command, error = %e, "Access denied");
            return Outcome::access_denied();
        }

        debug!(command = %command, kind = %self.kind, object_id = request.object_id, "Executing block command");
        let result = match command {
            Command::Index | Command::Cancel => Ok(Outcome::to_content()),
            Command::Add => self.add(request),
            Command::Create => self.create(request),
            Command::Edit => self.edit(request),
            Command::Update => self.update(request),
            Command::Confirm => self.confirm(request),
            Command::Delete => self.delete(request),
        };

        result.unwrap_or_else(|e| {
            warn!(command = %command, error = %e, "Block command failed");
            Outcome::failed(e.flash_key())
        })
    }

    /// `Read` for `index`, `Write` for everything else
    fn authorize(&self, command: Command, ref_id: i64) -> Result<(), LearnplaceError> {
        let permission = if command.requires_write() { Permission::Write } else { Permission::Read };
        if !self.guard.has_permission(permission, ref_id) {
            return Err(LearnplaceError::AccessDenied(format!(
                "{} permission on ref {} is required for {}",
                permission, ref_id, command
            )));
        }
        Ok(())
    }

    fn add(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let configuration = self.services.configuration.find_by_object_id(request.object_id)?;
        let block = Block::new(BlockContent::empty(self.kind))
            .with_visibility(configuration.default_visibility);

        Ok(Outcome::Render(View::EditForm {
            form: BlockForm::from_block(&block),
            error: None,
            saved_query: saved_query(request, &[QUERY_POSITION, QUERY_ACCORDION]),
        }))
    }

    fn create(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let form = self.posted_form(request)?;
        match self.place_new_block(request, &form) {
            Err(e) if e.is_validation() => Ok(self.redisplay(request, form, e)),
            other => other,
        }
    }

    fn place_new_block(&self, request: &Request, form: &BlockForm) -> Result<Outcome, LearnplaceError> {
        let mut block = form.to_block()?;
        block.id = UNASSIGNED_ID;

        let accordion_id = request.query_id(QUERY_ACCORDION);
        let anchor = if accordion_id > 0 {
            self.ensure_reference(request, accordion_id)?;
            let mut accordion = self.services.accordion.find(accordion_id)?;
            let position = request.insert_position(accordion.len());
            accordion.insert(block, position)?;
            let accordion = self.services.accordion.store(accordion)?;
            accordion.sequence()
        } else {
            let mut learnplace = self.services.learnplace.find_by_object_id(request.object_id)?;
            let position = request.insert_position(learnplace.len());
            let index = learnplace.insert(block, position)?;
            let learnplace = self.services.learnplace.store(learnplace)?;
            learnplace.blocks.get(index).map_or(0, |b| b.sequence)
        };

        info!(kind = %self.kind, object_id = request.object_id, accordion_id, anchor, "Created block");
        Ok(Outcome::saved(MSG_SAVE_SUCCESS, Some(anchor)))
    }

    fn edit(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let block_id = request.query_id(QUERY_BLOCK);
        self.ensure_reference(request, block_id)?;
        let block = self.find_own_kind(block_id)?;
        Ok(Outcome::Render(View::EditForm {
            form: BlockForm::from_block(&block),
            error: None,
            saved_query: saved_query(request, &[QUERY_BLOCK]),
        }))
    }

    fn confirm(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let block_id = request.query_id(QUERY_BLOCK);
        self.ensure_reference(request, block_id)?;
        Ok(Outcome::Render(View::ConfirmDelete { block_id }))
    }

    fn update(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let form = self.posted_form(request)?;
        match self.update_block(request, &form) {
            Err(e) if e.is_validation() => Ok(self.redisplay(request, form, e)),
            other => other,
        }
    }

    fn update_block(&self, request: &Request, form: &BlockForm) -> Result<Outcome, LearnplaceError> {
        let mut block = form.to_block()?;
        if block.is_new() {
            return Err(LearnplaceError::InvalidReference("block id is missing".into()));
        }
        self.ensure_reference(request, block.id)?;

        let old = self.find_own_kind(block.id)?;
        block.sequence = old.sequence;
        let block = self.services.block.store(block)?;

        Ok(Outcome::saved(MSG_SAVE_SUCCESS, Some(block.sequence)))
    }

    fn delete(&self, request: &Request) -> Result<Outcome, LearnplaceError> {
        let block_id = request.query_id(QUERY_BLOCK);
        self.ensure_reference(request, block_id)?;

        let container = self.services.block.container_of(block_id)?;
        self.services.block.delete(block_id)?;
        if let Some(container) = container {
            self.services.regenerate_container(container)?;
        }

        info!(block_id, object_id = request.object_id, "Deleted block");
        Ok(Outcome::saved(MSG_DELETE_SUCCESS, None))
    }

    fn posted_form(&self, request: &Request) -> Result<BlockForm, LearnplaceError> {
        let form = request.form.clone().unwrap_or_else(|| BlockForm::new(self.kind));
        if form.kind != self.kind {
            return Err(LearnplaceError::InvalidReference(format!(
                "{} form posted to the {} controller",
                form.kind, self.kind
            )));
        }
        Ok(form)
    }

    fn find_own_kind(&self, block_id: i64) -> Result<Block, LearnplaceError> {
        let block = self.services.block.find(block_id)?;
        if block.kind() != self.kind {
            return Err(LearnplaceError::InvalidReference(format!(
                "block {} is a {} block",
                block_id,
                block.kind()
            )));
        }
        Ok(block)
    }

    /// Fail with `InvalidReference` unless `block_id` sits in the request's
    /// learnplace, directly or inside one of its accordions
    fn ensure_reference(&self, request: &Request, block_id: i64) -> Result<(), LearnplaceError> {
        let learnplace = self.services.learnplace.find_by_object_id(request.object_id)?;

        let owner = match self.services.block.container_of(block_id)? {
            Some(Container::Learnplace(id)) => Some(id),
            Some(Container::Accordion(accordion_id)) => {
                match self.services.block.container_of(accordion_id)? {
                    Some(Container::Learnplace(id)) => Some(id),
                    _ => None,
                }
            }
            None => None,
        };

        if owner != Some(learnplace.id) {
            warn!(block_id, learnplace_id = learnplace.id, "Rejected foreign block reference");
            return Err(LearnplaceError::InvalidReference(format!(
                "block {} does not belong to learnplace {}",
                block_id, learnplace.id
            )));
        }
        Ok(())
    }

    fn redisplay(&self, request: &Request, form: BlockForm, error: LearnplaceError) -> Outcome {
        debug!(kind = %self.kind, error = %error, "Redisplaying block form");
        Outcome::Render(View::EditForm {
            form,
            error: Some(error.to_string()),
            saved_query: saved_query(request, &[QUERY_POSITION, QUERY_ACCORDION, QUERY_BLOCK]),
        })
    }
}

fn saved_query(request: &Request, keys: &[&str]) -> Vec<(String, String)> {
    keys.iter()
        .filter_map(|key| request.query.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::LearnplaceDb;
    use crate::model::{Accordion, Location, Visibility};
    use crate::security::StaticAccessGuard;
    use crate::controller::form::{FIELD_BLOCK_ID, FIELD_CONTENT, FIELD_TITLE, FIELD_VISIBILITY};

    const REF_ID: i64 = 500;
    const OBJECT_ID: i64 = 50;

    fn setup() -> Arc<Services> {
        let db = Arc::new(LearnplaceDb::open_in_memory().unwrap());
        let config = Config { default_visibility: Visibility::OnlyAtPlace, ..Config::default() };
        let services = Arc::new(Services::new(db, &config));
        services
            .learnplace
            .create(OBJECT_ID, Location { latitude: 47.05, longitude: 8.3, elevation: 435.0, radius: 50 })
            .unwrap();
        services
    }

    fn controller(services: &Arc<Services>, kind: BlockKind) -> BlockController {
        BlockController::new(kind, services.clone(), Arc::new(StaticAccessGuard::allow_all()))
    }

    fn text_form(content: &str) -> BlockForm {
        BlockForm::new(BlockKind::RichText)
            .with(FIELD_VISIBILITY, "ALWAYS")
            .with(FIELD_CONTENT, content)
    }

    fn create_text(controller: &BlockController, content: &str, position: Option<i64>) -> Outcome {
        let mut request = Request::new(REF_ID, OBJECT_ID, Command::Create).with_form(text_form(content));
        if let Some(position) = position {
            request = request.with_query(QUERY_POSITION, position);
        }
        controller.execute(&request)
    }

    fn contents(services: &Services) -> Vec<String> {
        services
            .learnplace
            .find_by_object_id(OBJECT_ID)
            .unwrap()
            .blocks
            .into_iter()
            .map(|b| match b.content {
                BlockContent::RichText { content } => content,
                other => other.kind().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_access_denied_redirects_to_repository() {
        let services = setup();
        let controller = BlockController::new(
            BlockKind::RichText,
            services.clone(),
            Arc::new(StaticAccessGuard::deny_all().grant(REF_ID, Permission::Read)),
        );

        let outcome = create_text(&controller, "text", None);
        assert_eq!(outcome, Outcome::access_denied());
        assert_eq!(outcome.flash().map(Flash::key), Some("common_access_denied"));
        assert!(contents(&services).is_empty());

        let index = controller.execute(&Request::new(REF_ID, OBJECT_ID, Command::Index));
        assert_eq!(index, Outcome::to_content());
    }

    #[test]
    fn test_unknown_command_is_denied() {
        let services = setup();
        let request = Request { command: Some("publish".into()), ..Request::new(REF_ID, OBJECT_ID, Command::Index) };
        assert_eq!(controller(&services, BlockKind::RichText).execute(&request), Outcome::access_denied());
    }

    #[test]
    fn test_add_prefills_default_visibility() {
        let services = setup();
        let request = Request::new(REF_ID, OBJECT_ID, Command::Add)
            .with_query(QUERY_POSITION, 2)
            .with_query("unrelated", "x");

        match controller(&services, BlockKind::Video).execute(&request) {
            Outcome::Render(View::EditForm { form, error, saved_query }) => {
                assert_eq!(form.kind, BlockKind::Video);
                assert_eq!(form.get(FIELD_VISIBILITY), Some("ONLY_AT_PLACE"));
                assert!(error.is_none());
                assert_eq!(saved_query, vec![(QUERY_POSITION.to_string(), "2".to_string())]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_create_inserts_at_position_and_anchors() {
        let services = setup();
        let controller = controller(&services, BlockKind::RichText);

        create_text(&controller, "a", None);
        create_text(&controller, "c", None);
        let outcome = create_text(&controller, "b", Some(1));

        assert_eq!(outcome, Outcome::saved(MSG_SAVE_SUCCESS, Some(2)));
        assert_eq!(contents(&services), vec!["a", "b", "c"]);

        let outcome = create_text(&controller, "first", Some(-3));
        assert_eq!(outcome, Outcome::saved(MSG_SAVE_SUCCESS, Some(1)));
    }

    #[test]
    fn test_create_forces_new_id() {
        let services = setup();
        let controller = controller(&services, BlockKind::RichText);
        create_text(&controller, "original", None);
        let existing = services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks[0].id;

        let form = text_form("injected").with(FIELD_BLOCK_ID, existing.to_string());
        controller.execute(&Request::new(REF_ID, OBJECT_ID, Command::Create).with_form(form));

        assert_eq!(contents(&services), vec!["original", "injected"]);
    }

    #[test]
    fn test_create_with_invalid_form_redisplays_input() {
        let services = setup();
        let form = BlockForm::new(BlockKind::RichText)
            .with(FIELD_VISIBILITY, "ALWAYS")
            .with(FIELD_CONTENT, "   ");
        let request = Request::new(REF_ID, OBJECT_ID, Command::Create)
            .with_query(QUERY_POSITION, 0)
            .with_form(form.clone());

        match controller(&services, BlockKind::RichText).execute(&request) {
            Outcome::Render(View::EditForm { form: shown, error, .. }) => {
                assert_eq!(shown, form);
                assert!(error.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(contents(&services).is_empty());
    }

    #[test]
    fn test_second_map_redisplays_form() {
        let services = setup();
        let controller = controller(&services, BlockKind::Map);
        let form = BlockForm::new(BlockKind::Map).with(FIELD_VISIBILITY, "ALWAYS");
        let request = Request::new(REF_ID, OBJECT_ID, Command::Create).with_form(form);

        assert!(matches!(controller.execute(&request), Outcome::Redirect { .. }));
        assert!(matches!(controller.execute(&request), Outcome::Render(View::EditForm { .. })));
        assert!(services.learnplace.has_map(OBJECT_ID).unwrap());
        assert_eq!(services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks.len(), 1);
    }

    #[test]
    fn test_create_inside_accordion_anchors_at_accordion() {
        let services = setup();
        let text = controller(&services, BlockKind::RichText);
        create_text(&text, "intro", None);

        let accordion_form = BlockForm::new(BlockKind::Accordion)
            .with(FIELD_VISIBILITY, "ALWAYS")
            .with(FIELD_TITLE, "More");
        controller(&services, BlockKind::Accordion)
            .execute(&Request::new(REF_ID, OBJECT_ID, Command::Create).with_form(accordion_form));
        let accordion_id = services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks[1].id;

        let outcome = text.execute(
            &Request::new(REF_ID, OBJECT_ID, Command::Create)
                .with_query(QUERY_ACCORDION, accordion_id)
                .with_form(text_form("nested")),
        );
        assert_eq!(outcome, Outcome::saved(MSG_SAVE_SUCCESS, Some(2)));

        let accordion: Accordion = services.accordion.find(accordion_id).unwrap();
        assert_eq!(accordion.blocks.len(), 1);
        assert_eq!(accordion.sequences(), vec![1]);
        assert_eq!(contents(&services), vec!["intro", "accordion"]);
    }

    #[test]
    fn test_foreign_accordion_is_invalid_reference() {
        let services = setup();
        services
            .learnplace
            .create(OBJECT_ID + 1, Location { latitude: 0.0, longitude: 0.0, elevation: 0.0, radius: 10 })
            .unwrap();
        let foreign_form = BlockForm::new(BlockKind::Accordion)
            .with(FIELD_VISIBILITY, "ALWAYS")
            .with(FIELD_TITLE, "Elsewhere");
        controller(&services, BlockKind::Accordion).execute(
            &Request::new(REF_ID + 1, OBJECT_ID + 1, Command::Create).with_form(foreign_form),
        );
        let foreign = services.learnplace.find_by_object_id(OBJECT_ID + 1).unwrap().blocks[0].id;

        let outcome = controller(&services, BlockKind::RichText).execute(
            &Request::new(REF_ID, OBJECT_ID, Command::Create)
                .with_query(QUERY_ACCORDION, foreign)
                .with_form(text_form("sneaky")),
        );
        assert_eq!(outcome, Outcome::failed("message_invalid_reference"));
        assert!(services.accordion.find(foreign).unwrap().blocks.is_empty());
    }

    #[test]
    fn test_update_keeps_sequence() {
        let services = setup();
        let controller = controller(&services, BlockKind::RichText);
        create_text(&controller, "a", None);
        create_text(&controller, "b", None);
        let second = services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks[1].clone();

        let form = text_form("b, revised").with(FIELD_BLOCK_ID, second.id.to_string());
        let outcome = controller.execute(&Request::new(REF_ID, OBJECT_ID, Command::Update).with_form(form));

        assert_eq!(outcome, Outcome::saved(MSG_SAVE_SUCCESS, Some(2)));
        assert_eq!(contents(&services), vec!["a", "b, revised"]);
    }

    #[test]
    fn test_update_of_foreign_block_is_rejected() {
        let services = setup();
        let orphan = services
            .block
            .store(Block::new(BlockContent::RichText { content: "loose".into() }))
            .unwrap();

        let form = text_form("taken over").with(FIELD_BLOCK_ID, orphan.id.to_string());
        let outcome = controller(&services, BlockKind::RichText)
            .execute(&Request::new(REF_ID, OBJECT_ID, Command::Update).with_form(form));

        assert_eq!(outcome, Outcome::failed("message_invalid_reference"));
        assert_eq!(
            services.block.find(orphan.id).unwrap().content,
            BlockContent::RichText { content: "loose".into() }
        );
    }

    #[test]
    fn test_confirm_then_delete_regenerates_sequence() {
        let services = setup();
        let controller = controller(&services, BlockKind::RichText);
        for content in ["a", "b", "c"] {
            create_text(&controller, content, None);
        }
        let middle = services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks[1].id;

        let confirm = controller
            .execute(&Request::new(REF_ID, OBJECT_ID, Command::Confirm).with_query(QUERY_BLOCK, middle));
        assert_eq!(confirm, Outcome::Render(View::ConfirmDelete { block_id: middle }));

        let outcome = controller
            .execute(&Request::new(REF_ID, OBJECT_ID, Command::Delete).with_query(QUERY_BLOCK, middle));
        assert_eq!(outcome, Outcome::saved(MSG_DELETE_SUCCESS, None));

        let learnplace = services.learnplace.find_by_object_id(OBJECT_ID).unwrap();
        assert_eq!(contents(&services), vec!["a", "c"]);
        assert_eq!(learnplace.sequences(), vec![1, 2]);
    }

    #[test]
    fn test_delete_missing_block() {
        let services = setup();
        let outcome = controller(&services, BlockKind::RichText)
            .execute(&Request::new(REF_ID, OBJECT_ID, Command::Delete).with_query(QUERY_BLOCK, 999));
        assert_eq!(outcome, Outcome::failed("message_invalid_reference"));
    }

    #[test]
    fn test_edit_of_other_kind_is_rejected() {
        let services = setup();
        create_text(&controller(&services, BlockKind::RichText), "a", None);
        let id = services.learnplace.find_by_object_id(OBJECT_ID).unwrap().blocks[0].id;

        let request = Request::new(REF_ID, OBJECT_ID, Command::Edit).with_query(QUERY_BLOCK, id);
        assert!(matches!(
            controller(&services, BlockKind::RichText).execute(&request),
            Outcome::Render(View::EditForm { .. })
        ));
        assert_eq!(
            controller(&services, BlockKind::Picture).execute(&request),
            Outcome::failed("message_invalid_reference")
        );
    }

    #[test]
    fn test_edit_and_confirm_of_foreign_block_are_rejected() {
        let services = setup();
        services
            .learnplace
            .create(OBJECT_ID + 1, Location { latitude: 0.0, longitude: 0.0, elevation: 0.0, radius: 10 })
            .unwrap();
        let foreign_text = controller(&services, BlockKind::RichText).execute(
            &Request::new(REF_ID + 1, OBJECT_ID + 1, Command::Create).with_form(text_form("other place")),
        );
        assert!(matches!(foreign_text, Outcome::Redirect { .. }));
        let foreign = services.learnplace.find_by_object_id(OBJECT_ID + 1).unwrap().blocks[0].id;

        for command in [Command::Edit, Command::Confirm] {
            let outcome = controller(&services, BlockKind::RichText)
                .execute(&Request::new(REF_ID, OBJECT_ID, command).with_query(QUERY_BLOCK, foreign));
            assert_eq!(outcome, Outcome::failed("message_invalid_reference"));
        }
    }

    #[test]
    fn test_authorize_reports_access_denied() {
        let services = setup();
        let controller = BlockController::new(
            BlockKind::RichText,
            services,
            Arc::new(StaticAccessGuard::deny_all().grant(REF_ID, Permission::Read)),
        );

        assert!(controller.authorize(Command::Index, REF_ID).is_ok());
        let err = controller.authorize(Command::Delete, REF_ID).unwrap_err();
        assert!(matches!(err, LearnplaceError::AccessDenied(_)));
        assert_eq!(err.flash_key(), outcome::MSG_ACCESS_DENIED);
    }
}
