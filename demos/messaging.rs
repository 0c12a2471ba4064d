//! Tagged objects exchanging messages and reading layered values.
//!
//! Shows how to:
//! - put objects in play on a shared `TagHub`
//! - broadcast on a message tag and filter by the sender's tags
//! - layer a scoped repository over the default value repository

use std::rc::Rc;

use bevy_tag_unify::value::ScopedRepository;
use bevy_tag_unify::{
    tags, SourceFilter, TagHub, TagSet, TagValue, TagValueStore, Taggable, TaggedObject,
};

tags! {
    pub mod Tags {
        Team { Red; Blue; }
        Channel { Alert; }
        Stats { Speed; }
    }
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let hub = Rc::new(TagHub::new());
    let scout = TaggedObject::with_tags("Scout", TagSet::single(Tags::Team::Red::TAG));
    let base = TaggedObject::with_tags("Base", TagSet::single(Tags::Team::Red::TAG));
    let spy = TaggedObject::with_tags("Spy", TagSet::single(Tags::Team::Blue::TAG));

    for object in [&scout, &base, &spy] {
        object.set_message_tag(Tags::Channel::Alert::TAG);
        object.begin_play(&hub);
    }
    base.set_source_filter(SourceFilter::Include(TagSet::single(Tags::Team::Red::TAG)));
    base.on_event_received(|event| {
        if let Some(count) = event.payload.get::<u32>() {
            println!("Base heard an alert: {count} enemies");
        }
    });

    let reached = spy.broadcast_message(TagValue::new(99_u32));
    println!("Spy reached {reached} callbacks; the base ignored it");
    scout.broadcast_message(TagValue::new(3_u32));

    println!("Objects on a team: {}", hub.query(Tags::Team::TAG).len());
    println!("Red team: {}", hub.query(Tags::Team::Red::TAG).len());
    spy.add_tag(Tags::Team::Red::TAG);
    println!("Spy now passes as red: {}", spy.has_tag(Tags::Team::Red::TAG));

    let mut store = TagValueStore::new();
    let speed = Tags::Stats::Speed::TAG;
    store.set(speed, 1.0_f64, None);

    let boots = ScopedRepository::new("Boots").into_shared();
    ScopedRepository::begin_play(&boots, &mut store);
    store.set(speed, 1.5_f64, None);
    println!("Speed with boots: {:?}", store.get::<f64>(speed));

    ScopedRepository::end_play(&boots, &mut store);
    println!("Speed without boots: {:?}", store.get::<f64>(speed));

    hub.shutdown();
}
