diesel::table! {
    workflows (id) {
        id -> Integer,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    nodes (id) {
        id -> Integer,
        workflow_id -> Integer,
        text -> Text,
        created_at -> BigInt,
    }
}

diesel::table! {
    edges (id) {
        id -> Integer,
        workflow_id -> Integer,
        source_node_id -> Integer,
        target_node_id -> Integer,
        created_at -> BigInt,
    }
}

diesel::table! {
    faqs (id) {
        id -> Integer,
        question -> Text,
        answer -> Text,
        category -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    chat_sessions (id) {
        id -> Integer,
        session_id -> Text,
        user_id -> Text,
        title -> Text,
        category -> Text,
        total_messages -> BigInt,
        is_active -> Bool,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Integer,
        message_id -> Text,
        session_id -> Text,
        user_id -> Text,
        question -> Text,
        answer -> Nullable<Text>,
        source -> Text,
        timestamp -> BigInt,
    }
}
