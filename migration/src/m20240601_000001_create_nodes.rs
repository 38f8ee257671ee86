use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(string(Person::ExternalId).primary_key())
                    .col(string(Person::FullName))
                    .col(big_integer(Person::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Show::Table)
                    .if_not_exists()
                    .col(string(Show::ExternalId).primary_key())
                    .col(string(Show::Title))
                    .col(string(Show::Source))
                    .col(big_integer(Show::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Season::Table)
                    .if_not_exists()
                    .col(string(Season::SeasonId).primary_key())
                    .col(string(Season::ShowId))
                    .col(integer(Season::SeasonNumber))
                    .col(string(Season::Title))
                    .col(string_null(Season::RoughStart))
                    .col(string_null(Season::RoughEnd))
                    .col(string(Season::Source))
                    .col(big_integer(Season::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_season_show_number")
                    .table(Season::Table)
                    .col(Season::ShowId)
                    .col(Season::SeasonNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Episode::Table)
                    .if_not_exists()
                    .col(string(Episode::ExternalId).primary_key())
                    .col(string(Episode::ShowId))
                    .col(string(Episode::SeasonId))
                    .col(integer(Episode::SeasonNumber))
                    .col(integer(Episode::EpisodeNumber))
                    .col(string(Episode::AirDate))
                    .col(string(Episode::Title))
                    .col(big_integer(Episode::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episode_show_season")
                    .table(Episode::Table)
                    .col(Episode::ShowId)
                    .col(Episode::SeasonNumber)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(string(Genre::Name).primary_key())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Episode::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Season::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Show::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Person::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Person {
    Table,
    ExternalId,
    FullName,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Show {
    Table,
    ExternalId,
    Title,
    Source,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Season {
    Table,
    SeasonId,
    ShowId,
    SeasonNumber,
    Title,
    RoughStart,
    RoughEnd,
    Source,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Episode {
    Table,
    ExternalId,
    ShowId,
    SeasonId,
    SeasonNumber,
    EpisodeNumber,
    AirDate,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Name,
}
