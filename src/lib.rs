pub mod shared {
    pub mod infrastructure {
        pub mod event_store;
        pub mod observability;
    }
}

pub mod modules {
    pub mod teams {
        pub mod core {
            pub mod commands;
            pub mod events;
            pub mod evolve;
            pub mod state;
            pub mod value_objects;
        }
        pub mod use_cases {
            pub mod handle_command {
                pub mod decide;
                pub mod handler;
            }
            pub mod project_read_models {
                pub mod apply;
                pub mod model;
                pub mod projector;
                pub mod repository;
            }
            pub mod query_teams {
                pub mod queries_port;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod projections_in_memory;
                pub mod projections_postgres;
            }
        }
    }
}

pub mod shell;
