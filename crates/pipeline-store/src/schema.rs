// Diesel table definitions for the job store. Hand-maintained to mirror
// the SQLite schema rather than generated, since migrations live outside
// this crate.

diesel::table! {
    jobs (job_id) {
        job_id -> Text,
        processing_id -> Text,
        lane -> Text,
        retry_count -> Integer,
        filename -> Text,
        file_type -> Text,
        file_size -> BigInt,
        file_content -> Binary,
        pipeline_config -> Text,
        ocr_config -> Text,
        target_language -> Nullable<Text>,
        document_class -> Nullable<Text>,
        status -> Text,
        progress_percent -> Integer,
        current_step -> Nullable<Text>,
        original_text -> Nullable<Binary>,
        simplified_text -> Nullable<Binary>,
        translated_text -> Nullable<Binary>,
        result_data -> Nullable<Text>,
        error_message -> Nullable<Text>,
        total_tokens -> BigInt,
        total_cost -> Double,
        created_at -> Text,
        updated_at -> Text,
        completed_at -> Nullable<Text>,
    }
}

diesel::table! {
    step_executions (id) {
        id -> Integer,
        job_id -> Text,
        step_name -> Text,
        step_order -> Integer,
        status -> Text,
        started_at -> Nullable<Text>,
        completed_at -> Nullable<Text>,
        duration_ms -> Nullable<BigInt>,
        input_text -> Nullable<Text>,
        output_text -> Nullable<Text>,
        error_message -> Nullable<Text>,
        model_used -> Nullable<Text>,
        input_tokens -> Nullable<BigInt>,
        output_tokens -> Nullable<BigInt>,
        cost -> Nullable<Double>,
    }
}

diesel::table! {
    ai_interaction_logs (id) {
        id -> Integer,
        job_id -> Text,
        step_execution_id -> Nullable<Integer>,
        model -> Text,
        input_tokens -> BigInt,
        output_tokens -> BigInt,
        cost -> Double,
        latency_ms -> BigInt,
        success -> Bool,
        error_code -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    pipeline_steps (id) {
        id -> Integer,
        name -> Text,
        description -> Text,
        order_in_phase -> Integer,
        document_class_id -> Nullable<Integer>,
        post_branching -> Bool,
        enabled -> Bool,
        is_branching_step -> Bool,
        model_id -> Integer,
        temperature -> Double,
        max_tokens -> Integer,
        prompt_template -> Text,
        system_prompt -> Nullable<Text>,
        required_context_variables -> Text,
        stop_on_values -> Nullable<Text>,
        allowed_continue_tokens -> Nullable<Text>,
        termination_reason -> Nullable<Text>,
        termination_message -> Nullable<Text>,
        retry_on_failure -> Bool,
        max_retries -> Integer,
        input_source -> Text,
        output_format -> Text,
        version -> Integer,
    }
}

diesel::table! {
    document_classes (id) {
        id -> Integer,
        class_key -> Text,
        display_name -> Text,
        enabled -> Bool,
    }
}

diesel::table! {
    models (id) {
        id -> Integer,
        name -> Text,
        provider -> Text,
        input_price_per_million -> Double,
        output_price_per_million -> Double,
        max_tokens -> Integer,
        supports_vision -> Bool,
        supports_streaming -> Bool,
        active -> Bool,
    }
}

diesel::table! {
    system_settings (key) {
        key -> Text,
        value -> Text,
        is_encrypted -> Bool,
    }
}

diesel::table! {
    ocr_configurations (id) {
        id -> Integer,
        name -> Text,
        config -> Text,
        active -> Bool,
    }
}

diesel::table! {
    feature_flags (name) {
        name -> Text,
        enabled -> Bool,
    }
}

diesel::joinable!(step_executions -> jobs (job_id));
diesel::joinable!(ai_interaction_logs -> jobs (job_id));
diesel::joinable!(pipeline_steps -> models (model_id));

diesel::allow_tables_to_appear_in_same_query!(
    jobs,
    step_executions,
    ai_interaction_logs,
    pipeline_steps,
    document_classes,
    models,
    system_settings,
    ocr_configurations,
    feature_flags,
);
