mod gateway;
mod helpers;
mod mocks;
mod payouts;
mod wallets;
mod webhook;
