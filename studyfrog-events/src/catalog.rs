//! Named application events.
//!
//! Every event the StudyFrog backend and UI exchange is listed here once so
//! that publishers and subscribers share the same name. Ids are assigned in
//! the order below, starting at the factory's base id.

use crate::event::{Event, EventFactory};
use once_cell::sync::Lazy;

macro_rules! catalog {
    ($($field:ident => $name:literal,)+) => {
        /// The application event catalog.
        #[derive(Debug, Clone)]
        pub struct Events {
            $(
                #[doc = concat!("`", $name, "`")]
                pub $field: Event,
            )+
        }

        impl Events {
            /// Number of events in the catalog.
            pub const LEN: usize = [$($name),+].len();

            /// Create every catalog event through `factory`, in catalog order.
            pub fn new(factory: &EventFactory) -> Self {
                Self {
                    $($field: factory.create_known($name),)+
                }
            }

            /// Every event, in catalog order.
            pub fn all(&self) -> Vec<&Event> {
                vec![$(&self.$field),+]
            }
        }
    };
}

catalog! {
    answer_created => "backend:answer:created",
    answer_deleted => "backend:answer:deleted",
    answer_loaded => "backend:answer:loaded",
    answer_updated => "backend:answer:updated",
    application_started => "global:application:started",
    application_stopped => "global:application:stopped",
    association_created => "backend:association:created",
    association_deleted => "backend:association:deleted",
    association_loaded => "backend:association:loaded",
    association_updated => "backend:association:updated",
    button_clicked => "ui:button:clicked",
    cancel_button_clicked => "ui:cancel_button:clicked",
    change_history_created => "backend:change_history:created",
    change_history_deleted => "backend:change_history:deleted",
    change_history_loaded => "backend:change_history:loaded",
    change_history_updated => "backend:change_history:updated",
    change_history_item_created => "backend:change_history_item:created",
    change_history_item_deleted => "backend:change_history_item:deleted",
    change_history_item_loaded => "backend:change_history_item:loaded",
    change_history_item_updated => "backend:change_history_item:updated",
    create_button_clicked => "ui:create:button:clicked",
    difficulty_created => "backend:difficulty:created",
    difficulty_deleted => "backend:difficulty:deleted",
    difficulty_loaded => "backend:difficulty:loaded",
    difficulty_updated => "backend:difficulty:updated",
    flashcard_created => "backend:flashcard:created",
    flashcard_deleted => "backend:flashcard:deleted",
    flashcard_loaded => "backend:flashcard:loaded",
    flashcard_updated => "backend:flashcard:updated",
    generic_event => "global:generic:event",
    label_clicked => "ui:label:clicked",
    help_button_clicked => "ui:help:button:clicked",
    menu_button_clicked => "ui:menu:button:clicked",
    navigate => "ui:navigate",
    navigate_validate_failure => "ui:navigate:validate:failure",
    navigate_validate_success => "ui:navigate:validate:success",
    navigation_completed => "ui:navigation:completed",
    note_created => "backend:note:created",
    note_deleted => "backend:note:deleted",
    note_loaded => "backend:note:loaded",
    note_updated => "backend:note:updated",
    notifications_button_clicked => "ui:notifications:button:clicked",
    okay_button_clicked => "ui:button:okay:clicked",
    priority_created => "backend:priority:created",
    priority_deleted => "backend:priority:deleted",
    priority_loaded => "backend:priority:loaded",
    priority_updated => "backend:priority:updated",
    question_created => "backend:question:created",
    question_deleted => "backend:question:deleted",
    question_loaded => "backend:question:loaded",
    question_updated => "backend:question:updated",
    request_answer_create => "global:request:answer:create",
    request_answer_delete => "global:request:answer:delete",
    request_answer_load => "global:request:answer:load",
    request_answer_lookup => "global:request:answer:lookup",
    request_answer_update => "global:request:answer:update",
    request_application_stop => "global:request:application:stop",
    request_association_create => "global:request:association:create",
    request_association_delete => "global:request:association:delete",
    request_association_load => "global:request:association:load",
    request_association_lookup => "global:request:association:lookup",
    request_association_update => "global:request:association:update",
    request_backward_navigation => "global:request:backward:navigation",
    request_change_history_create => "global:request:change_history:create",
    request_change_history_delete => "global:request:change_history:delete",
    request_change_history_load => "global:request:change_history:load",
    request_change_history_lookup => "global:request:change_history:lookup",
    request_change_history_update => "global:request:change_history:update",
    request_change_history_item_create => "global:request:change_history_item:create",
    request_change_history_item_delete => "global:request:change_history_item:delete",
    request_change_history_item_load => "global:request:change_history_item:load",
    request_change_history_item_lookup => "global:request:change_history_item:lookup",
    request_change_history_item_update => "global:request:change_history_item:update",
    request_custom_field_create => "global:request:custom_field:create",
    request_custom_field_delete => "global:request:custom_field:delete",
    request_custom_field_load => "global:request:custom_field:load",
    request_custom_field_lookup => "global:request:custom_field:lookup",
    request_custom_field_update => "global:request:custom_field:update",
    request_difficulty_create => "global:request:difficulty:create",
    request_difficulty_delete => "global:request:difficulty:delete",
    request_difficulty_load => "global:request:difficulty:load",
    request_difficulty_lookup => "global:request:difficulty:lookup",
    request_difficulty_update => "global:request:difficulty:update",
    request_exit_ui_mainloop => "global:request:exit:mainloop",
    request_forward_navigation => "global:request:forward:navigation",
    request_flashcard_create => "global:request:flashcard:create",
    request_flashcard_delete => "global:request:flashcard:delete",
    request_flashcard_load => "global:request:flashcard:load",
    request_flashcard_lookup => "global:request:flashcard:lookup",
    request_flashcard_update => "global:request:flashcard:update",
    request_get_all_answers => "global:request:get:all:answers",
    request_get_all_associations => "global:request:get:all:associations",
    request_get_all_change_histories => "global:request:get:all:change:histories",
    request_get_all_change_history_items => "global:request:get:all:change:history:items",
    request_get_all_custom_fields => "global:request:get:all:custom:fields",
    request_get_all_defaults => "global:request:get:all:defaults",
    request_get_all_difficulties => "global:request:get:all:difficulties",
    request_get_all_flashcards => "global:request:get:all:flashcards",
    request_get_all_notes => "global:request:get:all:notes",
    request_get_all_options => "global:request:get:all:options",
    request_get_all_priorities => "global:request:get:all:priorities",
    request_get_all_questions => "global:request:get:all:questions",
    request_get_all_settings => "global:request:get:all:settings",
    request_get_all_stacks => "global:request:get:all:stacks",
    request_get_all_statuses => "global:request:get:all:statuses",
    request_get_all_tags => "global:request:get:all:tags",
    request_get_all_users => "global:request:get:all:users",
    request_get_by_key => "global:request:get:by:key",
    request_get_by_keys => "global:request:get:by:keys",
    request_note_create => "global:request:note:create",
    request_note_delete => "global:request:note:delete",
    request_note_load => "global:request:note:load",
    request_note_lookup => "global:request:note:lookup",
    request_note_update => "global:request:note:update",
    request_option_create => "global:request:option:create",
    request_option_delete => "global:request:option:delete",
    request_option_load => "global:request:option:load",
    request_option_lookup => "global:request:option:lookup",
    request_option_update => "global:request:option:update",
    request_priority_create => "global:request:priority:create",
    request_priority_delete => "global:request:priority:delete",
    request_priority_load => "global:request:priority:load",
    request_priority_lookup => "global:request:priority:lookup",
    request_priority_update => "global:request:priority:update",
    request_question_create => "global:request:question:create",
    request_question_delete => "global:request:question:delete",
    request_question_load => "global:request:question:load",
    request_question_lookup => "global:request:question:lookup",
    request_question_update => "global:request:question:update",
    request_setting_create => "global:request:setting:create",
    request_setting_delete => "global:request:setting:delete",
    request_setting_load => "global:request:setting:load",
    request_setting_lookup => "global:request:setting:lookup",
    request_setting_update => "global:request:setting:update",
    request_stack_create => "global:request:stack:create",
    request_stack_delete => "global:request:stack:delete",
    request_stack_load => "global:request:stack:load",
    request_stack_lookup => "global:request:stack:lookup",
    request_stack_update => "global:request:stack:update",
    request_status_create => "global:request:status:create",
    request_status_delete => "global:request:status:delete",
    request_status_load => "global:request:status:load",
    request_status_lookup => "global:request:status:lookup",
    request_status_update => "global:request:status:update",
    request_tag_create => "global:request:tag:create",
    request_tag_delete => "global:request:tag:delete",
    request_tag_load => "global:request:tag:load",
    request_tag_lookup => "global:request:tag:lookup",
    request_tag_update => "global:request:tag:update",
    request_timer_pause => "global:request:timer:pause",
    request_timer_resume => "global:request:timer:resume",
    request_timer_start => "global:request:timer:start",
    request_timer_stop => "global:request:timer:stop",
    request_user_create => "global:request:user:create",
    request_user_delete => "global:request:user:delete",
    request_user_load => "global:request:user:load",
    request_user_lookup => "global:request:user:lookup",
    request_user_update => "global:request:user:update",
    request_validate_navigation => "global:request:validate:navigation",
    settings_button_clicked => "ui:settings:button:clicked",
    search_query_changed => "ui:search:query:changed",
    stack_created => "backend:stack:created",
    stack_deleted => "backend:stack:deleted",
    stack_loaded => "backend:stack:loaded",
    stack_updated => "backend:stack:updated",
    tag_created => "backend:tag:created",
    tag_deleted => "backend:tag:deleted",
    tag_loaded => "backend:tag:loaded",
    tag_updated => "backend:tag:updated",
    toast_clicked => "ui:toast:clicked",
    toast_destroyed => "ui:toast:destroyed",
    timer_started => "ui:timer:started",
    timer_stopped => "ui:timer:stopped",
    user_button_clicked => "ui:button:user:clicked",
    user_created => "backend:user:created",
    user_deleted => "backend:user:deleted",
    user_loaded => "backend:user:loaded",
    user_updated => "backend:user:updated",
}

static GLOBAL_EVENTS: Lazy<Events> = Lazy::new(|| Events::new(EventFactory::global()));

impl Events {
    /// The process-wide catalog, built from [`EventFactory::global`] on first use.
    pub fn global() -> &'static Events {
        &GLOBAL_EVENTS
    }

    /// Find a catalog event by its dispatch name.
    pub fn by_name(&self, name: &str) -> Option<&Event> {
        self.iter().find(|event| event.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.all().into_iter()
    }

    /// Catalog events whose name starts with `prefix`, e.g. `"backend:stack:"`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |event| event.name().starts_with(prefix))
    }
}
