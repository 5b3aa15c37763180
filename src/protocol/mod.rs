/*!
 * Object-store backends
 *
 * The store interface itself lives in the `skystash-store` crate; this module
 * holds the network-backed implementations.
 */

pub mod s3;
