//! Diesel table definitions for the SQLite-backed stores.
//!
//! Hand-written rather than generated by `diesel print-schema` since this
//! crate ships its own migrations and is not run against `diesel setup`
//! during this exercise; keep it in sync with `migrations/`.

diesel::table! {
    tasks (task_id) {
        task_id -> Text,
        kind -> Text,
        code -> Text,
        default_params -> Text,
        working_dir -> Nullable<Text>,
        env -> Text,
        timeout_seconds -> BigInt,
        enabled -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    task_queue (id) {
        id -> Integer,
        request_id -> Text,
        task_id -> Text,
        parameters -> Text,
        status -> Text,
        worker_id -> Nullable<Text>,
        lease_expires_at -> Nullable<Timestamp>,
        enqueued_at -> Timestamp,
        started_at -> Nullable<Timestamp>,
        finished_at -> Nullable<Timestamp>,
        output -> Nullable<Text>,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    execution_stacks (id) {
        id -> Integer,
        stack_id -> Text,
        created_at -> Timestamp,
        finished_at -> Nullable<Timestamp>,
        status -> Text,
        initial_request_id -> Text,
        initial_task_id -> Text,
        initial_params -> Text,
        variables -> Text,
        outputs -> Text,
        decisions -> Text,
        errors -> Text,
        metadata -> Text,
        final_output -> Nullable<Text>,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    stack_queue (id) {
        id -> Integer,
        stack_id -> Text,
        request_id -> Text,
        task_id -> Text,
        depth -> Integer,
        parent_queue_id -> Nullable<Integer>,
        sequence -> Integer,
        status -> Text,
        enqueued_at -> Timestamp,
        started_at -> Nullable<Timestamp>,
        finished_at -> Nullable<Timestamp>,
        worker_id -> Nullable<Text>,
        lease_expires_at -> Nullable<Timestamp>,
        parameters -> Text,
        input_context -> Text,
        output -> Nullable<Text>,
        output_context -> Nullable<Text>,
        pushed_children -> Text,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    task_requests (id) {
        id -> Integer,
        request_id -> Text,
        task_id -> Text,
        parameters -> Text,
        status -> Text,
        priority -> Integer,
        requester -> Text,
        created_at -> Timestamp,
        claimed_by -> Nullable<Text>,
        claimed_at -> Nullable<Timestamp>,
        finished_at -> Nullable<Timestamp>,
        result_ref -> Nullable<Text>,
        error -> Nullable<Text>,
        triggered_by_rule -> Nullable<Text>,
    }
}

diesel::table! {
    request_dependencies (id) {
        id -> Integer,
        request_id -> Text,
        depends_on_request_id -> Text,
    }
}

diesel::table! {
    cascade_rules (id) {
        id -> Integer,
        rule_id -> Text,
        source_kind -> Nullable<Text>,
        task_id -> Text,
        parameter_template -> Text,
        priority -> Integer,
        enabled -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    execution_events (id) {
        id -> Integer,
        stack_id -> Nullable<Text>,
        queue_id -> Nullable<Integer>,
        request_id -> Nullable<Text>,
        event_type -> Text,
        event_data -> Nullable<Text>,
        worker_id -> Nullable<Text>,
        created_at -> Timestamp,
        sequence_num -> BigInt,
    }
}

diesel::table! {
    control_flags (flag_key) {
        flag_key -> Text,
        flag_value -> Text,
    }
}
