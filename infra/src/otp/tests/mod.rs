//! Unit tests for OTP module

mod http_client_tests;
