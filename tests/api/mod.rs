mod access_tests;
mod auth_tests;
mod health_tests;
