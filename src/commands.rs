pub mod retrieve_token;
