table! {
    analytics (id) {
        id -> Integer,
        date -> Date,
        posts_count -> Integer,
        comments_count -> Integer,
        views_count -> Integer,
        new_subscribers -> Integer,
    }
}

table! {
    comments (id) {
        id -> Integer,
        post_id -> Integer,
        author_name -> Text,
        author_email -> Text,
        content -> Text,
        approved -> Bool,
        creation_date -> Timestamp,
    }
}

table! {
    medias (id) {
        id -> Integer,
        file_path -> Text,
        alt_text -> Text,
        owner_id -> Integer,
    }
}

table! {
    post_tags (id) {
        id -> Integer,
        post_id -> Integer,
        tag_id -> Integer,
    }
}

table! {
    posts (id) {
        id -> Integer,
        title -> Text,
        slug -> Text,
        author_id -> Integer,
        content -> Text,
        excerpt -> Text,
        cover_id -> Nullable<Integer>,
        status -> Text,
        creation_date -> Timestamp,
        update_date -> Timestamp,
        published_at -> Nullable<Timestamp>,
        views -> Integer,
    }
}

table! {
    subscribers (id) {
        id -> Integer,
        email -> Text,
        active -> Bool,
        subscription_date -> Timestamp,
    }
}

table! {
    tags (id) {
        id -> Integer,
        name -> Text,
        slug -> Text,
        creation_date -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        hashed_password -> Nullable<Text>,
        bio -> Text,
        avatar_id -> Nullable<Integer>,
        role -> Integer,
        creation_date -> Timestamp,
    }
}

joinable!(comments -> posts (post_id));
joinable!(medias -> users (owner_id));
joinable!(post_tags -> posts (post_id));
joinable!(post_tags -> tags (tag_id));
joinable!(posts -> users (author_id));

allow_tables_to_appear_in_same_query!(
    analytics,
    comments,
    medias,
    post_tags,
    posts,
    subscribers,
    tags,
    users,
);
