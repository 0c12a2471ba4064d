//! Tags as components in a Bevy app.
//!
//! Shows how to:
//! - install `TagUnifyPlugin` with the paths of a `tags!` tree
//! - attach `TagSet` components to entities
//! - run subtree queries inside systems

use bevy::prelude::*;
use bevy_tag_unify::bevy::TagUnifyPlugin;
use bevy_tag_unify::{tags, TagNames, TagSet};

tags! {
    pub mod Tags {
        Movement {
            Idle;
            Running;
        }
        Status {
            Poisoned;
            Burning;
        }
    }
}

#[derive(Component)]
struct Label(&'static str);

fn main() {
    let mut app = App::new();
    app.add_plugins(TagUnifyPlugin::from_paths(Tags::PATHS))
        .add_systems(Startup, spawn_entities)
        .add_systems(Update, (print_tags, report_status).chain());

    // One frame is enough to run the startup and update systems once.
    app.update();
}

fn spawn_entities(mut commands: Commands) {
    commands.spawn((Label("Hero"), TagSet::single(Tags::Movement::Running::TAG)));
    commands.spawn((
        Label("Goblin"),
        TagSet::new()
            .with(Tags::Movement::Idle::TAG)
            .with(Tags::Status::Poisoned::TAG),
    ));
    commands.spawn((Label("Imp"), TagSet::single(Tags::Status::Burning::TAG)));
}

fn print_tags(names: Res<TagNames>, query: Query<(&Label, &TagSet)>) {
    for (label, tags) in &query {
        let paths: Vec<String> = tags.iter().map(|tag| names.display(tag)).collect();
        println!("{}: {}", label.0, paths.join(", "));
    }
}

fn report_status(query: Query<(&Label, &TagSet)>) {
    for (label, tags) in &query {
        if tags.has(Tags::Status::TAG) {
            println!("{} has a status effect", label.0);
        }
        if tags.has(Tags::Movement::TAG) && !tags.has(Tags::Movement::Idle::TAG) {
            println!("{} is on the move", label.0);
        }
    }
}
