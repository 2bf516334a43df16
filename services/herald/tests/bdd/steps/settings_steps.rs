//! BDD step definitions for server settings feature

use cucumber::{given, then, when};

use herald::settings::SettingsStore;

use crate::world::HeraldWorld;

async fn open_store(world: &mut HeraldWorld) {
    let dir = world.settings_dir.as_ref().expect("settings dir not set");
    let path = dir.path().join("server_settings.json");
    world.store = Some(SettingsStore::open(path, world.service_ids()).await);
}

fn store(world: &HeraldWorld) -> &SettingsStore {
    world.store.as_ref().expect("settings store not opened")
}

fn parse_channels(list: &str) -> Vec<u64> {
    list.split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.parse().expect("channel id"))
        .collect()
}

#[given("an empty settings store")]
async fn empty_store(world: &mut HeraldWorld) {
    world.settings_dir = Some(tempfile::tempdir().expect("tempdir"));
    open_store(world).await;
}

#[given(expr = "server {string} announces in channel {int}")]
async fn server_announces_in(world: &mut HeraldWorld, server_id: String, channel_id: u64) {
    store(world)
        .set_channel(&server_id, channel_id)
        .await
        .expect("set channel");
}

#[given(expr = "server {string} has unsubscribed from {string}")]
async fn server_unsubscribed(world: &mut HeraldWorld, server_id: String, service_id: String) {
    let settings = store(world)
        .toggle_subscription(&server_id, &service_id)
        .await
        .expect("toggle");
    assert!(!settings.subscribed_services.contains(&service_id));
}

#[when(expr = "server {string} sets its announcement channel to {int}")]
async fn set_channel(world: &mut HeraldWorld, server_id: String, channel_id: u64) {
    let result = store(world).set_channel(&server_id, channel_id).await;
    match result {
        Ok(settings) => world.settings = Some(settings),
        Err(e) => world.settings_error = Some(e),
    }
}

#[when(expr = "server {string} toggles {string}")]
async fn toggle(world: &mut HeraldWorld, server_id: String, service_id: String) {
    let result = store(world)
        .toggle_subscription(&server_id, &service_id)
        .await;
    match result {
        Ok(settings) => world.settings = Some(settings),
        Err(e) => world.settings_error = Some(e),
    }
}

#[when("the settings store is reopened")]
async fn reopen(world: &mut HeraldWorld) {
    open_store(world).await;
}

#[when(expr = "the settings for server {string} are read")]
async fn read_settings(world: &mut HeraldWorld, server_id: String) {
    let settings = store(world).get(&server_id).await;
    world.settings = Some(settings);
}

#[then("the announcement channel is unset")]
fn channel_unset(world: &mut HeraldWorld) {
    let settings = world.settings.as_ref().expect("no settings read");
    assert_eq!(settings.channel_id, None);
}

#[then(expr = "the announcement channel is {int}")]
fn channel_is(world: &mut HeraldWorld, channel_id: u64) {
    let settings = world.settings.as_ref().expect("no settings read");
    assert_eq!(settings.channel_id, Some(channel_id));
}

#[then(expr = "the server is subscribed to {int} services")]
fn subscribed_count(world: &mut HeraldWorld, count: usize) {
    let settings = world.settings.as_ref().expect("no settings read");
    assert_eq!(settings.subscribed_services.len(), count);
}

#[then(expr = "the server is subscribed to {string}")]
fn subscribed_to(world: &mut HeraldWorld, service_id: String) {
    let settings = world.settings.as_ref().expect("no settings read");
    assert!(settings.subscribed_services.contains(&service_id));
}

#[then(expr = "the server is not subscribed to {string}")]
fn not_subscribed_to(world: &mut HeraldWorld, service_id: String) {
    let settings = world.settings.as_ref().expect("no settings read");
    assert!(!settings.subscribed_services.contains(&service_id));
}

#[then("the settings change is rejected as invalid")]
fn change_rejected(world: &mut HeraldWorld) {
    let err = world.settings_error.as_ref().expect("change was accepted");
    assert!(matches!(err, herald::HeraldError::InvalidRequest(_)), "{}", err);
}

#[then(expr = "announcements for {string} reach channels {string}")]
async fn service_announcements_reach(world: &mut HeraldWorld, service_id: String, channels: String) {
    let reached: Vec<u64> = store(world)
        .subscribers(Some(&service_id))
        .await
        .into_iter()
        .map(|(_, channel)| channel)
        .collect();
    assert_eq!(reached, parse_channels(&channels));
}

#[then(expr = "general announcements reach channels {string}")]
async fn general_announcements_reach(world: &mut HeraldWorld, channels: String) {
    let reached: Vec<u64> = store(world)
        .subscribers(None)
        .await
        .into_iter()
        .map(|(_, channel)| channel)
        .collect();
    assert_eq!(reached, parse_channels(&channels));
}
