use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkedOn::Table)
                    .if_not_exists()
                    .col(pk_auto(WorkedOn::Id))
                    .col(string(WorkedOn::PersonId))
                    .col(string(WorkedOn::TargetKind))
                    .col(string(WorkedOn::TargetId))
                    .col(string(WorkedOn::JobTitle))
                    .col(string(WorkedOn::Source))
                    .col(big_integer(WorkedOn::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_worked_on_unique")
                    .table(WorkedOn::Table)
                    .col(WorkedOn::PersonId)
                    .col(WorkedOn::TargetKind)
                    .col(WorkedOn::TargetId)
                    .col(WorkedOn::JobTitle)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_worked_on_target")
                    .table(WorkedOn::Table)
                    .col(WorkedOn::TargetKind)
                    .col(WorkedOn::TargetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkedWith::Table)
                    .if_not_exists()
                    .col(pk_auto(WorkedWith::Id))
                    .col(string(WorkedWith::PersonA))
                    .col(string(WorkedWith::PersonB))
                    .col(string(WorkedWith::StartDate))
                    .col(string(WorkedWith::EndDate))
                    .col(integer(WorkedWith::SharedSeasonCount))
                    .col(string(WorkedWith::SeasonLabels))
                    .col(big_integer(WorkedWith::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_worked_with_pair")
                    .table(WorkedWith::Table)
                    .col(WorkedWith::PersonA)
                    .col(WorkedWith::PersonB)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HasGenre::Table)
                    .if_not_exists()
                    .col(pk_auto(HasGenre::Id))
                    .col(string(HasGenre::OwnerKind))
                    .col(string(HasGenre::OwnerId))
                    .col(string(HasGenre::Genre))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_has_genre_unique")
                    .table(HasGenre::Table)
                    .col(HasGenre::OwnerKind)
                    .col(HasGenre::OwnerId)
                    .col(HasGenre::Genre)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EpisodeOf::Table)
                    .if_not_exists()
                    .col(pk_auto(EpisodeOf::Id))
                    .col(string(EpisodeOf::EpisodeId))
                    .col(string(EpisodeOf::SeasonId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episode_of_unique")
                    .table(EpisodeOf::Table)
                    .col(EpisodeOf::EpisodeId)
                    .col(EpisodeOf::SeasonId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SeasonOf::Table)
                    .if_not_exists()
                    .col(pk_auto(SeasonOf::Id))
                    .col(string(SeasonOf::SeasonId))
                    .col(string(SeasonOf::ShowId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_season_of_unique")
                    .table(SeasonOf::Table)
                    .col(SeasonOf::SeasonId)
                    .col(SeasonOf::ShowId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SeasonOf::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(EpisodeOf::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(HasGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(WorkedWith::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(WorkedOn::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum WorkedOn {
    Table,
    Id,
    PersonId,
    TargetKind,
    TargetId,
    JobTitle,
    Source,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WorkedWith {
    Table,
    Id,
    PersonA,
    PersonB,
    StartDate,
    EndDate,
    SharedSeasonCount,
    SeasonLabels,
    CreatedAt,
}

#[derive(DeriveIden)]
enum HasGenre {
    Table,
    Id,
    OwnerKind,
    OwnerId,
    Genre,
}

#[derive(DeriveIden)]
enum EpisodeOf {
    Table,
    Id,
    EpisodeId,
    SeasonId,
}

#[derive(DeriveIden)]
enum SeasonOf {
    Table,
    Id,
    SeasonId,
    ShowId,
}
